//! Two-panel performance chart
//!
//! Left: monthly sales per department (만원), as grouped bars or lines.
//! Right: yearly totals (억), as year-over-year bars when a comparison year
//! is present, a pie for up to four departments, horizontal bars otherwise.
//!
//! Text is drawn with a TrueType font registered from the configured path;
//! without one the renderer fails with [`ReportError::Font`].

use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{to_eok, to_man, ReportError};
use crate::intent::{ChartType, Department};
use crate::storage::PerformanceRecord;

const WIDTH: u32 = 1400;
const HEIGHT: u32 = 500;
const FONT_FAMILY: &str = "smartspend-hangul";
const MAX_MONTHLY_SERIES: usize = 6;
const MAX_TOTALS: usize = 8;

const PALETTE: [RGBColor; 8] = [
    RGBColor(0x4F, 0x46, 0xE5),
    RGBColor(0x10, 0xB9, 0x81),
    RGBColor(0xF5, 0x9E, 0x0B),
    RGBColor(0xEF, 0x44, 0x44),
    RGBColor(0x8B, 0x5C, 0xF6),
    RGBColor(0xEC, 0x48, 0x99),
    RGBColor(0x06, 0xB6, 0xD4),
    RGBColor(0x84, 0xCC, 0x16),
];
const PREVIOUS_YEAR_COLOR: RGBColor = RGBColor(0x94, 0xA3, 0xB8);
const CURRENT_YEAR_COLOR: RGBColor = RGBColor(0x4F, 0x46, 0xE5);

static FONT_REGISTRATION: OnceLock<Result<(), String>> = OnceLock::new();

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type DrawResult = Result<(), Box<dyn std::error::Error>>;

fn color_at(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Everything needed to draw one chart
#[derive(Debug, Clone)]
pub struct PerformanceChart {
    pub year: i32,
    pub compare_year: Option<i32>,
    pub chart_type: ChartType,
    pub departments: Vec<Department>,
    pub data: Vec<PerformanceRecord>,
    pub compare_data: Option<Vec<PerformanceRecord>>,
}

impl PerformanceChart {
    /// Distinct months present in the data, ascending
    pub fn months(&self) -> Vec<u32> {
        let mut months: Vec<u32> = self.data.iter().map(|r| r.month).collect();
        months.sort_unstable();
        months.dedup();
        months
    }

    /// Per-department `(month index, 만원)` points for the first six departments
    pub fn monthly_series(&self) -> Vec<(Department, Vec<(usize, f64)>)> {
        let months = self.months();
        self.departments
            .iter()
            .take(MAX_MONTHLY_SERIES)
            .map(|&department| {
                let mut points: Vec<(usize, f64)> = self
                    .data
                    .iter()
                    .filter(|r| r.department == department)
                    .filter_map(|r| {
                        months
                            .iter()
                            .position(|m| *m == r.month)
                            .map(|idx| (idx, to_man(r.sales_amount)))
                    })
                    .collect();
                points.sort_by_key(|(idx, _)| *idx);
                (department, points)
            })
            .collect()
    }

    /// Yearly totals in 억, largest first, at most eight
    pub fn ranked_totals(&self) -> Vec<(Department, f64)> {
        let mut totals: Vec<(Department, f64)> = self
            .departments
            .iter()
            .map(|&d| (d, to_eok(sum_sales(&self.data, d))))
            .collect();
        totals.sort_by(|a, b| b.1.total_cmp(&a.1));
        totals.truncate(MAX_TOTALS);
        totals
    }
}

fn sum_sales(rows: &[PerformanceRecord], department: Department) -> i64 {
    rows.iter()
        .filter(|r| r.department == department)
        .map(|r| r.sales_amount)
        .sum()
}

fn index_label(labels: &[String], position: f64) -> String {
    let rounded = position.round();
    if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

/// Chart renderer
#[derive(Debug, Clone, Default)]
pub struct ChartRenderer {
    font_path: Option<PathBuf>,
}

impl ChartRenderer {
    pub fn new(font_path: Option<PathBuf>) -> Self {
        Self { font_path }
    }

    /// Register the chart font once per process
    fn ensure_font(&self) -> Result<(), ReportError> {
        if let Some(result) = FONT_REGISTRATION.get() {
            return result.clone().map_err(ReportError::Font);
        }

        let path = self
            .font_path
            .as_deref()
            .ok_or_else(|| ReportError::Font("no chart font configured".to_string()))?;

        FONT_REGISTRATION
            .get_or_init(|| {
                let bytes = load_font(path)?;
                register_font(FONT_FAMILY, FontStyle::Normal, bytes)
                    .map_err(|_| format!("{}: not a usable TrueType font", path.display()))
            })
            .clone()
            .map_err(ReportError::Font)
    }

    /// Render the chart as PNG bytes
    pub fn render_png(&self, chart: &PerformanceChart) -> Result<Vec<u8>, ReportError> {
        self.ensure_font()?;

        let mut buffer = vec![255u8; (WIDTH * HEIGHT * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
            draw_panels(&root, chart).map_err(|e| ReportError::Chart(e.to_string()))?;
            root.present().map_err(|e| ReportError::Chart(e.to_string()))?;
        }

        let image = RgbImage::from_raw(WIDTH, HEIGHT, buffer)
            .ok_or_else(|| ReportError::Chart("pixel buffer size mismatch".to_string()))?;

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    /// Render on the blocking pool and return base64-encoded PNG
    pub async fn render_base64(&self, chart: PerformanceChart) -> Result<String, ReportError> {
        let renderer = self.clone();
        let png = tokio::task::spawn_blocking(move || renderer.render_png(&chart))
            .await
            .map_err(|e| ReportError::Task(e.to_string()))??;

        Ok(base64::engine::general_purpose::STANDARD.encode(png))
    }
}

/// Read a font file into memory that lives as long as the process
fn load_font(path: &Path) -> Result<&'static [u8], String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(Box::leak(bytes.into_boxed_slice()))
}

fn draw_panels(root: &Area<'_>, chart: &PerformanceChart) -> DrawResult {
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally(WIDTH / 2);

    draw_monthly(&left, chart)?;

    match (&chart.compare_data, chart.compare_year) {
        (Some(previous), Some(compare_year)) => draw_year_compare(&right, chart, previous, compare_year),
        _ if chart.departments.len() <= 4 => draw_share(&right, chart),
        _ => draw_ranking(&right, chart),
    }
}

fn draw_monthly(area: &Area<'_>, chart: &PerformanceChart) -> DrawResult {
    let labels: Vec<String> = chart.months().iter().map(|m| format!("{m}월")).collect();
    let series = chart.monthly_series();
    let line = chart.chart_type == ChartType::Line;

    let max = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|(_, v)| *v))
        .fold(0.0_f64, f64::max);
    let y_max = if max > 0.0 { max * 1.15 } else { 1.0 };
    let slots = labels.len().max(1);

    let title = format!("{}년 월별 매출 {}", chart.year, if line { "추이" } else { "비교" });
    let mut ctx = ChartBuilder::on(area)
        .caption(title, (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5_f64..(slots as f64 - 0.5), 0.0_f64..y_max)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(slots)
        .x_label_formatter(&|x| index_label(&labels, *x))
        .x_desc("월")
        .y_desc("매출액 (만원)")
        .label_style((FONT_FAMILY, 13))
        .axis_desc_style((FONT_FAMILY, 14))
        .draw()?;

    let bar_width = 0.8 / series.len().max(1) as f64;
    for (i, (department, points)) in series.iter().enumerate() {
        let color = color_at(i);

        if line {
            let coords: Vec<(f64, f64)> = points.iter().map(|(idx, v)| (*idx as f64, *v)).collect();
            ctx.draw_series(LineSeries::new(coords.clone(), color.stroke_width(2)))?
                .label(department.name())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
            ctx.draw_series(coords.into_iter().map(|c| Circle::new(c, 4, color.filled())))?;
        } else {
            let offset = bar_width * (i as f64 - series.len() as f64 / 2.0 + 0.5);
            ctx.draw_series(points.iter().map(|(idx, v)| {
                let x = *idx as f64 + offset;
                Rectangle::new([(x - bar_width / 2.0, 0.0), (x + bar_width / 2.0, *v)], color.filled())
            }))?
            .label(department.name())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }
    }

    if !series.is_empty() {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font((FONT_FAMILY, 12))
            .draw()?;
    }

    Ok(())
}

fn draw_year_compare(
    area: &Area<'_>,
    chart: &PerformanceChart,
    previous: &[PerformanceRecord],
    compare_year: i32,
) -> DrawResult {
    let totals = chart.ranked_totals();
    let labels: Vec<String> = totals.iter().map(|(d, _)| d.name().to_string()).collect();
    let previous_totals: Vec<f64> = totals
        .iter()
        .map(|(d, _)| to_eok(sum_sales(previous, *d)))
        .collect();

    let max = totals
        .iter()
        .map(|(_, v)| *v)
        .chain(previous_totals.iter().copied())
        .fold(0.0_f64, f64::max);
    let y_max = if max > 0.0 { max * 1.15 } else { 1.0 };
    let slots = labels.len().max(1);

    let mut ctx = ChartBuilder::on(area)
        .caption(format!("{compare_year}년 vs {}년", chart.year), (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5_f64..(slots as f64 - 0.5), 0.0_f64..y_max)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(slots)
        .x_label_formatter(&|x| index_label(&labels, *x))
        .y_desc("매출액 (억원)")
        .label_style((FONT_FAMILY, 13))
        .axis_desc_style((FONT_FAMILY, 14))
        .draw()?;

    ctx.draw_series(previous_totals.iter().enumerate().map(|(i, v)| {
        let x = i as f64;
        Rectangle::new([(x - 0.35, 0.0), (x, *v)], PREVIOUS_YEAR_COLOR.filled())
    }))?
    .label(format!("{compare_year}년"))
    .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], PREVIOUS_YEAR_COLOR.filled()));

    ctx.draw_series(totals.iter().enumerate().map(|(i, (_, v))| {
        let x = i as f64;
        Rectangle::new([(x, 0.0), (x + 0.35, *v)], CURRENT_YEAR_COLOR.filled())
    }))?
    .label(format!("{}년", chart.year))
    .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], CURRENT_YEAR_COLOR.filled()));

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font((FONT_FAMILY, 12))
        .draw()?;

    Ok(())
}

fn draw_share(area: &Area<'_>, chart: &PerformanceChart) -> DrawResult {
    let totals = chart.ranked_totals();
    let area = area.titled(&format!("{}년 매출 비율", chart.year), (FONT_FAMILY, 22))?;

    let sizes: Vec<f64> = totals.iter().map(|(_, v)| *v).collect();
    if sizes.iter().sum::<f64>() <= 0.0 {
        return Ok(());
    }
    let labels: Vec<&str> = totals.iter().map(|(d, _)| d.name()).collect();
    let colors: Vec<RGBColor> = (0..totals.len()).map(color_at).collect();

    // Pie draws in backend pixels, so the center is offset by the panel origin
    let (width, height) = area.dim_in_pixel();
    let (left, top) = area.get_base_pixel();
    let center = (left + width as i32 / 2, top + height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style((FONT_FAMILY, 15).into_font().color(&BLACK));
    pie.percentages((FONT_FAMILY, 13).into_font().color(&WHITE));
    area.draw(&pie)?;

    Ok(())
}

fn draw_ranking(area: &Area<'_>, chart: &PerformanceChart) -> DrawResult {
    let totals = chart.ranked_totals();
    let count = totals.len().max(1);
    // Largest total at the top
    let labels: Vec<String> = totals.iter().rev().map(|(d, _)| d.name().to_string()).collect();
    let row_of = |rank: usize| (count - 1 - rank) as f64;

    let max = totals.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let x_max = if max > 0.0 { max * 1.2 } else { 1.0 };

    let mut ctx = ChartBuilder::on(area)
        .caption(format!("{}년 매출 순위", chart.year), (FONT_FAMILY, 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0_f64..x_max, -0.5_f64..(count as f64 - 0.5))?;

    ctx.configure_mesh()
        .disable_y_mesh()
        .y_labels(count)
        .y_label_formatter(&|y| index_label(&labels, *y))
        .x_desc("매출액 (억원)")
        .label_style((FONT_FAMILY, 13))
        .axis_desc_style((FONT_FAMILY, 14))
        .draw()?;

    ctx.draw_series(totals.iter().enumerate().map(|(rank, (_, v))| {
        let y = row_of(rank);
        Rectangle::new([(0.0, y - 0.35), (*v, y + 0.35)], color_at(rank).filled())
    }))?;

    ctx.draw_series(totals.iter().enumerate().map(|(rank, (_, v))| {
        Text::new(
            format!("{v:.1}억"),
            (*v + x_max * 0.01, row_of(rank)),
            (FONT_FAMILY, 12).into_font(),
        )
    }))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(department: Department, month: u32, sales: i64) -> PerformanceRecord {
        PerformanceRecord {
            department,
            year: 2025,
            month,
            sales_amount: sales,
            contract_count: 1,
            project_count: 1,
            target_achievement_rate: 100.0,
        }
    }

    fn sample() -> PerformanceChart {
        PerformanceChart {
            year: 2025,
            compare_year: None,
            chart_type: ChartType::Bar,
            departments: vec![Department::Dev1, Department::Sales],
            data: vec![
                record(Department::Dev1, 2, 30_000_000),
                record(Department::Dev1, 1, 10_000_000),
                record(Department::Sales, 2, 50_000_000),
            ],
            compare_data: None,
        }
    }

    #[test]
    fn test_months_are_sorted_and_unique() {
        assert_eq!(sample().months(), vec![1, 2]);
    }

    #[test]
    fn test_monthly_series_maps_months_to_slots() {
        let series = sample().monthly_series();
        assert_eq!(series[0], (Department::Dev1, vec![(0, 1000.0), (1, 3000.0)]));
        assert_eq!(series[1], (Department::Sales, vec![(1, 5000.0)]));
    }

    #[test]
    fn test_ranked_totals_are_descending() {
        let totals = sample().ranked_totals();
        assert_eq!(totals[0].0, Department::Sales);
        assert!((totals[0].1 - 0.5).abs() < 1e-9);
        assert!((totals[1].1 - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_index_label_only_on_whole_positions() {
        let labels = vec!["1월".to_string(), "2월".to_string()];
        assert_eq!(index_label(&labels, 1.0), "2월");
        assert_eq!(index_label(&labels, 0.5), "");
        assert_eq!(index_label(&labels, -1.0), "");
        assert_eq!(index_label(&labels, 5.0), "");
    }

    #[test]
    fn test_missing_font_file_fails() {
        let err = load_font(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(err.starts_with("/nonexistent/font.ttf"));
    }

    fn system_font() -> Option<PathBuf> {
        std::env::var_os("SMARTSPEND_CHART_FONT")
            .map(PathBuf::from)
            .into_iter()
            .chain(
                [
                    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
                    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                    "/usr/share/fonts/TTF/DejaVuSans.ttf",
                    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
                ]
                .map(PathBuf::from),
            )
            .find(|p| p.is_file())
    }

    fn assert_renders(renderer: &ChartRenderer, chart: &PerformanceChart) {
        let png = renderer
            .render_png(chart)
            .unwrap_or_else(|e| panic!("{:?}/{} departments: {e}", chart.chart_type, chart.departments.len()));
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (WIDTH, HEIGHT));
    }

    #[test]
    fn test_renders_every_panel_layout() {
        let Some(font) = system_font() else {
            eprintln!("no TrueType font found, skipping chart rendering");
            return;
        };
        let renderer = ChartRenderer::new(Some(font));

        let all: Vec<Department> = Department::ALL.to_vec();
        let all_rows: Vec<PerformanceRecord> = all
            .iter()
            .enumerate()
            .flat_map(|(i, &d)| (1..=3).map(move |m| record(d, m, (i as i64 + 1) * 10_000_000 * m as i64)))
            .collect();

        for chart_type in [ChartType::Bar, ChartType::Line, ChartType::Pie] {
            // Two departments: share pie on the right
            let mut chart = sample();
            chart.chart_type = chart_type;
            assert_renders(&renderer, &chart);

            // Previous year present: year-over-year bars
            let mut compare = sample();
            compare.chart_type = chart_type;
            compare.compare_year = Some(2024);
            compare.compare_data = Some(vec![
                record(Department::Dev1, 1, 20_000_000),
                record(Department::Sales, 1, 40_000_000),
            ]);
            assert_renders(&renderer, &compare);

            // Every department: ranking bars
            let ranking = PerformanceChart {
                year: 2025,
                compare_year: None,
                chart_type,
                departments: all.clone(),
                data: all_rows.clone(),
                compare_data: None,
            };
            assert_renders(&renderer, &ranking);
        }
    }

    #[test]
    fn test_renders_without_sales() {
        let Some(font) = system_font() else {
            return;
        };
        let chart = PerformanceChart {
            year: 2025,
            compare_year: None,
            chart_type: ChartType::Pie,
            departments: vec![Department::Design],
            data: vec![record(Department::Design, 1, 0)],
            compare_data: None,
        };
        assert_renders(&ChartRenderer::new(Some(font)), &chart);
    }
}
