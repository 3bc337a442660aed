//! Common test utilities
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use smartspend_ai::intent::Department;
use smartspend_ai::llm::{GenerationOptions, LlmError, TextGenerator};
use smartspend_ai::services::{AttendanceRecord, AttendanceSource, BackendError};
use smartspend_ai::storage::{PerformanceRecord, PerformanceStore, StorageError};

/// Fixed reference date for deterministic defaults
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

// ============================================================================
// Text generation
// ============================================================================

/// Generator that replays queued answers; an exhausted queue times out
#[derive(Default)]
pub struct ScriptedGenerator {
    answers: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer
    pub fn answer(self, text: &str) -> Self {
        self.answers.lock().unwrap().push_back(Some(text.to_string()));
        self
    }

    /// Queue a timeout
    pub fn time_out(self) -> Self {
        self.answers.lock().unwrap().push_back(None);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn backend(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.answers.lock().unwrap().pop_front() {
            Some(Some(text)) => Ok(text),
            Some(None) | None => Err(LlmError::Timeout),
        }
    }
}

// ============================================================================
// Attendance
// ============================================================================

pub fn attendance(name: &str, date: &str, status_korean: &str) -> AttendanceRecord {
    AttendanceRecord {
        employee_no: Some(format!("E{:03}", name.chars().count())),
        employee_name: Some(name.to_string()),
        date: Some(date.to_string()),
        status: Some("PRESENT".to_string()),
        status_korean: Some(status_korean.to_string()),
        check_in_time: Some("09:00".to_string()),
        check_out_time: Some("18:00".to_string()),
    }
}

/// Attendance rows held per department; every month returns the same rows
#[derive(Default)]
pub struct StaticAttendance {
    rows: HashMap<Department, Vec<AttendanceRecord>>,
    requests: Mutex<Vec<(Department, i32, u32)>>,
    failing: bool,
}

impl StaticAttendance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, department: Department, rows: Vec<AttendanceRecord>) -> Self {
        self.rows.insert(department, rows);
        self
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(Department, i32, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttendanceSource for StaticAttendance {
    async fn fetch_month(
        &self,
        department: Department,
        year: i32,
        month: u32,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        self.requests.lock().unwrap().push((department, year, month));
        if self.failing {
            return Err(BackendError::Timeout);
        }
        Ok(self.rows.get(&department).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Performance
// ============================================================================

pub fn performance(department: Department, year: i32, month: u32, sales: i64) -> PerformanceRecord {
    PerformanceRecord {
        department,
        year,
        month,
        sales_amount: sales,
        contract_count: 3,
        project_count: 2,
        target_achievement_rate: 95.0,
    }
}

/// In-memory performance table
#[derive(Default)]
pub struct MemoryStore {
    rows: Vec<PerformanceRecord>,
    failing: bool,
}

impl MemoryStore {
    pub fn new(rows: Vec<PerformanceRecord>) -> Self {
        Self { rows, failing: false }
    }

    pub fn failing() -> Self {
        Self {
            rows: Vec::new(),
            failing: true,
        }
    }
}

#[async_trait]
impl PerformanceStore for MemoryStore {
    async fn fetch(
        &self,
        departments: &[Department],
        year: i32,
    ) -> Result<Vec<PerformanceRecord>, StorageError> {
        if self.failing {
            return Err(StorageError::Timeout);
        }
        Ok(self
            .rows
            .iter()
            .filter(|r| r.year == year && departments.contains(&r.department))
            .cloned()
            .collect())
    }
}
