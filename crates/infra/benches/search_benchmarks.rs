use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::NaiveDate;
use workforce_auth::{CredentialHash, Principal, PrincipalId, RoleToken, Scope};
use workforce_core::{DepartmentId, EmployeeId};
use workforce_directory::{Department, Employee, EmployeeDraft, EmployeePredicate, Gender, SearchCriteria};
use workforce_infra::store::{Change, Changeset, DirectoryStore, InMemoryDirectoryStore};

const TITLES: [&str; 4] = ["Engineer", "Analyst", "Designer", "Support"];

fn employee(n: usize, department: DepartmentId) -> Employee {
    let gender = match n % 3 {
        0 => Gender::Female,
        1 => Gender::Male,
        _ => Gender::Other,
    };
    EmployeeDraft {
        first_name: format!("First{n}"),
        last_name: format!("Last{n}"),
        email: format!("person{n}@example.com"),
        phone_number: "555-0100".to_string(),
        job_title: TITLES[n % TITLES.len()].to_string(),
        salary: 1_000 + n as i64,
        hire_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        gender,
    }
    .into_employee(EmployeeId::new(), department, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    .unwrap()
}

/// `size` employees spread over four departments.
fn populated_store(runtime: &tokio::runtime::Runtime, size: usize) -> (InMemoryDirectoryStore, Vec<DepartmentId>) {
    let store = InMemoryDirectoryStore::new();
    let departments: Vec<Department> = (0..4)
        .map(|i| Department::new(DepartmentId::new(), &format!("Department {i}")).unwrap())
        .collect();
    let ids = departments.iter().map(|d| d.id).collect::<Vec<_>>();

    let mut cs = Changeset::new();
    for d in departments {
        cs.push(Change::InsertDepartment(d));
    }
    for n in 0..size {
        let e = employee(n, ids[n % ids.len()]);
        cs.push(Change::InsertPrincipal(Principal {
            id: e.principal_id.clone(),
            credential: CredentialHash::from_phc("$argon2id$bench"),
            roles: vec![RoleToken::Employee],
            must_reset_credential: false,
        }));
        cs.push(Change::InsertEmployee(e));
    }
    runtime.block_on(store.commit(cs)).unwrap();
    (store, ids)
}

fn bench_predicate_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("predicate_filter");
    let department = DepartmentId::new();

    for size in [100usize, 1_000, 10_000].iter() {
        let staff: Vec<Employee> = (0..*size).map(|n| employee(n, department)).collect();
        let criteria = SearchCriteria {
            name: Some("st1".to_string()),
            job_title: Some("Engineer".to_string()),
            ..Default::default()
        };
        let predicate = EmployeePredicate::compose(&criteria, &Scope::RestrictedToDepartment(department));

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(predicate.filter(&staff)))
        });
    }
    group.finish();
}

fn bench_scoped_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("in_memory_scoped_query");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for size in [1_000usize, 10_000].iter() {
        let (store, departments) = populated_store(&runtime, *size);
        let predicate = EmployeePredicate::all().scoped(&Scope::RestrictedToDepartment(departments[0]));

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(runtime.block_on(store.query_employees(&predicate)).unwrap()))
        });
    }
    group.finish();
}

fn bench_principal_snapshot(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (store, _) = populated_store(&runtime, 10_000);
    let principal = PrincipalId::new("person9999@example.com");

    c.bench_function("principal_snapshot_10k", |b| {
        b.iter(|| black_box(runtime.block_on(store.principal_snapshot(&principal)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_predicate_filter,
    bench_scoped_query,
    bench_principal_snapshot
);
criterion_main!(benches);
