use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use workforce_auth::PrincipalId;
use workforce_core::{DepartmentId, DomainError, DomainResult, EmployeeId, Entity, ValueObject};

/// Gender as recorded on the employee file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::Other => "OTHER",
        }
    }
}

impl core::fmt::Display for Gender {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            "OTHER" => Ok(Gender::Other),
            other => Err(DomainError::validation(format!("unknown gender '{other}'"))),
        }
    }
}

/// Salary in minor currency units. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Salary(i64);

impl Salary {
    pub fn new(amount: i64) -> DomainResult<Self> {
        if amount <= 0 {
            return Err(DomainError::validation("salary must be a positive amount"));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> i64 {
        self.0
    }
}

impl ValueObject for Salary {}

impl TryFrom<i64> for Salary {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Salary::new(value)
    }
}

impl From<Salary> for i64 {
    fn from(value: Salary) -> Self {
        value.0
    }
}

/// A stored employee record.
///
/// `principal_id` is the account this employee exclusively owns; it is the
/// normalised form of `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub job_title: String,
    pub salary: Salary,
    pub hire_date: NaiveDate,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub department_id: DepartmentId,
    pub principal_id: PrincipalId,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating an employee (the role and department travel separately).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub job_title: String,
    pub salary: i64,
    pub hire_date: NaiveDate,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
}

impl EmployeeDraft {
    /// The account identifier the new employee will own.
    pub fn principal_id(&self) -> PrincipalId {
        PrincipalId::new(&self.email)
    }

    /// Check every field; `today` anchors the date-of-birth rule.
    pub fn validate(&self, today: NaiveDate) -> DomainResult<()> {
        require_text("first name", &self.first_name)?;
        require_text("last name", &self.last_name)?;
        require_email(&self.email)?;
        require_text("phone number", &self.phone_number)?;
        require_text("job title", &self.job_title)?;
        Salary::new(self.salary)?;
        require_dates(self.date_of_birth, self.hire_date, today)
    }

    /// Validate and turn the draft into a record owned by the draft's principal.
    pub fn into_employee(
        self,
        id: EmployeeId,
        department_id: DepartmentId,
        today: NaiveDate,
    ) -> DomainResult<Employee> {
        self.validate(today)?;
        let principal_id = self.principal_id();
        Ok(Employee {
            id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            job_title: self.job_title.trim().to_string(),
            salary: Salary::new(self.salary)?,
            hire_date: self.hire_date,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            department_id,
            principal_id,
        })
    }
}

/// Partial update. `None` keeps the current value.
///
/// Manager status is not patchable: reassigning the
/// department moves the employee, never a manager claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub job_title: Option<String>,
    pub salary: Option<i64>,
    pub hire_date: Option<NaiveDate>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub department_id: Option<DepartmentId>,
}

impl EmployeePatch {
    /// Produce the updated record, validating every supplied field.
    ///
    /// The e-mail doubles as the login identifier, so it may only change in
    /// spelling (case/whitespace), never to a different address.
    pub fn apply(&self, current: &Employee, today: NaiveDate) -> DomainResult<Employee> {
        let mut next = current.clone();

        if let Some(v) = &self.first_name {
            require_text("first name", v)?;
            next.first_name = v.trim().to_string();
        }
        if let Some(v) = &self.last_name {
            require_text("last name", v)?;
            next.last_name = v.trim().to_string();
        }
        if let Some(v) = &self.email {
            require_email(v)?;
            if PrincipalId::new(v) != current.principal_id {
                return Err(DomainError::validation(
                    "email is the login identifier and cannot be changed",
                ));
            }
            next.email = v.trim().to_string();
        }
        if let Some(v) = &self.phone_number {
            require_text("phone number", v)?;
            next.phone_number = v.trim().to_string();
        }
        if let Some(v) = &self.job_title {
            require_text("job title", v)?;
            next.job_title = v.trim().to_string();
        }
        if let Some(v) = self.salary {
            next.salary = Salary::new(v)?;
        }
        if let Some(v) = self.hire_date {
            next.hire_date = v;
        }
        if let Some(v) = self.date_of_birth {
            next.date_of_birth = v;
        }
        if let Some(v) = self.gender {
            next.gender = v;
        }
        if let Some(v) = self.department_id {
            next.department_id = v;
        }

        require_dates(next.date_of_birth, next.hire_date, today)?;
        Ok(next)
    }
}

fn require_text(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_email(value: &str) -> DomainResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation("email is required"));
    }
    let invalid = || DomainError::validation(format!("invalid email '{value}'"));

    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || value.chars().any(char::is_whitespace)
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
    {
        return Err(invalid());
    }
    Ok(())
}

fn require_dates(date_of_birth: NaiveDate, hire_date: NaiveDate, today: NaiveDate) -> DomainResult<()> {
    if date_of_birth >= today {
        return Err(DomainError::validation("date of birth must be in the past"));
    }
    if hire_date < date_of_birth {
        return Err(DomainError::validation("hire date cannot precede date of birth"));
    }
    Ok(())
}
