use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use workforce_core::DepartmentId;

use crate::employee::Employee;

/// One aggregated report line. Salaries are in minor units; the average is
/// rounded towards zero. Totals are widened so they cannot overflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub label: String,
    pub count: u64,
    pub average_salary: i64,
    pub total_salary: i128,
}

#[derive(Default)]
struct Bucket {
    count: u64,
    total: i128,
}

/// Group `employees` by `label_of`, ordered by label ascending.
pub fn group_by<'a, I, F>(employees: I, mut label_of: F) -> Vec<ReportRow>
where
    I: IntoIterator<Item = &'a Employee>,
    F: FnMut(&Employee) -> String,
{
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
    for employee in employees {
        let bucket = buckets.entry(label_of(employee)).or_default();
        bucket.count += 1;
        bucket.total += i128::from(employee.salary.amount());
    }

    buckets
        .into_iter()
        .map(|(label, b)| ReportRow {
            label,
            count: b.count,
            // The mean of i64 salaries is itself within i64.
            average_salary: (b.total / i128::from(b.count)) as i64,
            total_salary: b.total,
        })
        .collect()
}

/// Employees whose department is missing from `names` are labelled by id.
pub fn by_department<'a, I>(employees: I, names: &HashMap<DepartmentId, String>) -> Vec<ReportRow>
where
    I: IntoIterator<Item = &'a Employee>,
{
    group_by(employees, |e| {
        names
            .get(&e.department_id)
            .cloned()
            .unwrap_or_else(|| e.department_id.to_string())
    })
}

pub fn by_job_title<'a, I>(employees: I) -> Vec<ReportRow>
where
    I: IntoIterator<Item = &'a Employee>,
{
    group_by(employees, |e| e.job_title.clone())
}

pub fn by_gender<'a, I>(employees: I) -> Vec<ReportRow>
where
    I: IntoIterator<Item = &'a Employee>,
{
    group_by(employees, |e| e.gender.to_string())
}
