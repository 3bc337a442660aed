//! Korean text summaries

use std::fmt::Write;

use super::to_eok;
use crate::intent::Department;
use crate::services::backend::AttendanceRecord;
use crate::storage::PerformanceRecord;

const RULE: &str = "===================================";
const MEDALS: [&str; 8] = ["🥇", "🥈", "🥉", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣"];

/// Attendance counts by Korean status label
pub fn attendance_summary(records: &[AttendanceRecord]) -> String {
    let count = |label: &str| {
        records
            .iter()
            .filter(|r| r.status_korean.as_deref() == Some(label))
            .count()
    };

    format!(
        "📊 출결 통계\n- 총 기록: {}건\n- 출근: {}건\n- 지각: {}건\n- 결근: {}건\n- 휴가: {}건",
        records.len(),
        count("출근"),
        count("지각"),
        count("결근"),
        count("휴가"),
    )
}

/// One department's yearly figures
#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentTotals {
    pub department: Department,
    /// Yearly sales in KRW
    pub sales: i64,
    pub contracts: i64,
    /// Mean monthly achievement rate in percent
    pub average_rate: f64,
    /// Growth over the comparison year in percent
    pub growth: Option<f64>,
}

/// Aggregate rows per department, keeping `departments` order
///
/// Departments without rows are left out. Growth is only set when the
/// comparison year has rows for the department.
pub fn department_totals(
    data: &[PerformanceRecord],
    departments: &[Department],
    compare: Option<&[PerformanceRecord]>,
) -> Vec<DepartmentTotals> {
    departments
        .iter()
        .filter_map(|&department| {
            let rows: Vec<&PerformanceRecord> =
                data.iter().filter(|r| r.department == department).collect();
            if rows.is_empty() {
                return None;
            }

            let sales: i64 = rows.iter().map(|r| r.sales_amount).sum();
            let contracts: i64 = rows.iter().map(|r| r.contract_count).sum();
            let average_rate =
                rows.iter().map(|r| r.target_achievement_rate).sum::<f64>() / rows.len() as f64;

            let growth = compare.and_then(|previous| {
                let prev_rows: Vec<&PerformanceRecord> =
                    previous.iter().filter(|r| r.department == department).collect();
                if prev_rows.is_empty() {
                    return None;
                }
                let prev_sales: i64 = prev_rows.iter().map(|r| r.sales_amount).sum();
                Some(if prev_sales == 0 {
                    0.0
                } else {
                    (sales - prev_sales) as f64 / prev_sales as f64 * 100.0
                })
            });

            Some(DepartmentTotals {
                department,
                sales,
                contracts,
                average_rate,
                growth,
            })
        })
        .collect()
}

/// Per-department figures followed by a ranking when two or more departments have data
pub fn performance_summary(year: i32, totals: &[DepartmentTotals]) -> String {
    let mut out = format!("📊 {year}년 부서별 실적\n{RULE}\n");

    for t in totals {
        let _ = write!(
            out,
            "\n🏢 {}\n   매출: {:.1}억 | 계약: {}건 | 달성률: {:.1}%\n",
            t.department,
            to_eok(t.sales),
            t.contracts,
            t.average_rate
        );
        if let Some(growth) = t.growth {
            let arrow = if growth > 0.0 { "📈" } else { "📉" };
            let _ = writeln!(out, "   {arrow} 전년대비: {growth:+.1}%");
        }
    }

    if totals.len() >= 2 {
        let mut ranked: Vec<&DepartmentTotals> = totals.iter().collect();
        ranked.sort_by(|a, b| b.sales.cmp(&a.sales));

        let _ = write!(out, "\n{RULE}\n📈 순위\n");
        for (medal, t) in MEDALS.iter().zip(ranked) {
            let _ = writeln!(out, "   {medal} {}: {:.1}억", t.department, to_eok(t.sales));
        }
    }

    out.trim_end().to_string()
}

/// Compact `부서:금액억` list used as model input for insights
pub fn insight_input(totals: &[DepartmentTotals]) -> String {
    totals
        .iter()
        .map(|t| format!("{}:{:.1}억", t.department, to_eok(t.sales)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append a model-written insight section
pub fn with_insight(summary: &str, insight: &str) -> String {
    format!("{summary}\n\n{RULE}\n\n🤖 AI 분석\n{}", insight.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(department: Department, year: i32, month: u32, sales: i64) -> PerformanceRecord {
        PerformanceRecord {
            department,
            year,
            month,
            sales_amount: sales,
            contract_count: 2,
            project_count: 1,
            target_achievement_rate: 90.0,
        }
    }

    fn status(label: &str) -> AttendanceRecord {
        AttendanceRecord {
            status_korean: Some(label.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_attendance_summary_counts() {
        let records = vec![status("출근"), status("출근"), status("지각"), status("휴가"), status("조퇴")];
        let summary = attendance_summary(&records);

        assert!(summary.starts_with("📊 출결 통계"));
        assert!(summary.contains("- 총 기록: 5건"));
        assert!(summary.contains("- 출근: 2건"));
        assert!(summary.contains("- 지각: 1건"));
        assert!(summary.contains("- 결근: 0건"));
        assert!(summary.contains("- 휴가: 1건"));
    }

    #[test]
    fn test_department_totals_with_growth() {
        let data = vec![
            record(Department::Sales, 2025, 1, 150_000_000),
            record(Department::Sales, 2025, 2, 150_000_000),
        ];
        let previous = vec![record(Department::Sales, 2024, 1, 200_000_000)];

        let totals = department_totals(&data, &[Department::Sales, Department::Design], Some(&previous));
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].sales, 300_000_000);
        assert_eq!(totals[0].contracts, 4);
        assert_eq!(totals[0].growth, Some(50.0));
    }

    #[test]
    fn test_performance_summary_ranks_departments() {
        let data = vec![
            record(Department::Dev1, 2025, 1, 120_000_000),
            record(Department::Sales, 2025, 1, 350_000_000),
        ];
        let totals = department_totals(&data, &[Department::Dev1, Department::Sales], None);
        let summary = performance_summary(2025, &totals);

        assert!(summary.starts_with("📊 2025년 부서별 실적"));
        assert!(summary.contains("🏢 개발1팀\n   매출: 1.2억 | 계약: 2건 | 달성률: 90.0%"));
        assert!(summary.contains("🥇 영업팀: 3.5억"));
        assert!(summary.contains("🥈 개발1팀: 1.2억"));
        assert!(!summary.contains("전년대비"));
    }

    #[test]
    fn test_single_department_has_no_ranking() {
        let data = vec![record(Department::Finance, 2025, 1, 100_000_000)];
        let totals = department_totals(&data, &[Department::Finance], None);
        assert!(!performance_summary(2025, &totals).contains("순위"));
    }

    #[test]
    fn test_growth_line_sign() {
        let totals = vec![DepartmentTotals {
            department: Department::Finance,
            sales: 100,
            contracts: 1,
            average_rate: 50.0,
            growth: Some(-12.34),
        }];
        assert!(performance_summary(2025, &totals).contains("📉 전년대비: -12.3%"));
    }

    #[test]
    fn test_insight_section() {
        let text = with_insight("요약", "  ✅강점: 영업팀 호조\n");
        assert!(text.ends_with("🤖 AI 분석\n✅강점: 영업팀 호조"));
        assert_eq!(
            insight_input(&[DepartmentTotals {
                department: Department::Sales,
                sales: 250_000_000,
                contracts: 3,
                average_rate: 80.0,
                growth: None,
            }]),
            "영업팀:2.5억"
        );
    }
}
