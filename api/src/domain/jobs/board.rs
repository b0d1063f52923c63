//! Public job board filters and ordering.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::domain::jobs::job::{Job, JobStatus, salary_amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobSort {
    #[default]
    Latest,
    Oldest,
    Deadline,
    SalaryHigh,
    SalaryLow,
}

impl JobSort {
    /// Unknown values fall back to newest first.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => JobSort::Oldest,
            Some("deadline") => JobSort::Deadline,
            Some("salary_high") => JobSort::SalaryHigh,
            Some("salary_low") => JobSort::SalaryLow,
            _ => JobSort::Latest,
        }
    }

    /// Jobs without a readable salary sort last in both salary orders.
    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        let newest = b.created_at.cmp(&a.created_at);
        let salary = |x: &Job| salary_amount(&x.salary);
        match self {
            JobSort::Latest => newest,
            JobSort::Oldest => a.created_at.cmp(&b.created_at),
            JobSort::Deadline => a.deadline.cmp(&b.deadline).then(newest),
            JobSort::SalaryHigh | JobSort::SalaryLow => {
                let by_amount = match (salary(a), salary(b)) {
                    (Some(x), Some(y)) if *self == JobSort::SalaryHigh => y.cmp(&x),
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                by_amount.then(newest)
            }
        }
    }
}

/// Deadline buckets offered on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineWindow {
    /// Now through seven days out.
    ClosingSoon,
    /// Eight to thirty days out.
    Weeks,
    /// Thirty-one days out or later.
    Rolling,
}

impl DeadlineWindow {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim)? {
            "closing_soon" => Some(DeadlineWindow::ClosingSoon),
            "8-30_days" => Some(DeadlineWindow::Weeks),
            "rolling" => Some(DeadlineWindow::Rolling),
            _ => None,
        }
    }

    /// Inclusive `(from, until)` bounds relative to `now`.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        match self {
            DeadlineWindow::ClosingSoon => (now, Some(now + Duration::days(7))),
            DeadlineWindow::Weeks => (now + Duration::days(8), Some(now + Duration::days(30))),
            DeadlineWindow::Rolling => (now + Duration::days(31), None),
        }
    }
}

/// One page of the public board.
#[derive(Debug, Clone)]
pub struct BoardQuery {
    pub search: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub job_type: Option<String>,
    pub deadline: Option<DeadlineWindow>,
    pub sort: JobSort,
    pub page: u32,
    pub limit: u32,
}

impl Default for BoardQuery {
    fn default() -> Self {
        Self {
            search: None,
            country: None,
            city: None,
            job_type: None,
            deadline: None,
            sort: JobSort::Latest,
            page: 1,
            limit: 20,
        }
    }
}

fn trimmed(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl BoardQuery {
    /// Page at least 1, limit between 1 and 100, blank filters dropped, job type upper-cased.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, 100);
        self.search = trimmed(&self.search).map(|s| s.to_lowercase());
        self.country = trimmed(&self.country);
        self.city = trimmed(&self.city).map(|s| s.to_lowercase());
        self.job_type = trimmed(&self.job_type).map(|t| t.to_ascii_uppercase().replace('-', "_"));
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// ACTIVE, deadline no earlier than the start of today (UTC), then the optional filters.
    /// `school_name` joins the searchable text.
    pub fn matches(&self, job: &Job, school_name: &str, now: DateTime<Utc>) -> bool {
        let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        if job.status != JobStatus::Active || job.deadline < start_of_day {
            return false;
        }
        if let Some(needle) = &self.search {
            let hit = [
                job.title.as_str(),
                job.description.as_str(),
                job.city.as_str(),
                job.country.as_str(),
                school_name,
            ]
            .iter()
            .any(|f| f.to_lowercase().contains(needle.as_str()));
            if !hit {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if !job.country.eq_ignore_ascii_case(country) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !job.city.to_lowercase().contains(city.as_str()) {
                return false;
            }
        }
        if let Some(t) = &self.job_type {
            if !job.job_type.eq_ignore_ascii_case(t) {
                return false;
            }
        }
        if let Some(window) = self.deadline {
            let (from, until) = window.bounds(now);
            if job.deadline < from || until.is_some_and(|u| job.deadline > u) {
                return false;
            }
        }
        true
    }
}
