use crate::infra::Workflows;
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use cohort_intake::config::CohortConfig;
use cohort_intake::error::AppError;
use cohort_intake::workflows::enrollment::{EnrollmentError, Level, StudentId};
use cohort_intake::workflows::intake::{
    Answer, Disclosure, FieldId, IntakeError, SessionId, Toggle, PACKAGE_FIELD,
};

const APPLICANTS: [(&str, &str); 5] = [
    ("Sofia", "Pereyra"),
    ("Tomas", "Quiroga"),
    ("Valentina", "Ibarra"),
    ("Mateo", "Funes"),
    ("Lucia", "Bustos"),
];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// First day of the demo cycle (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Seats in the demo cycle.
    #[arg(long, default_value_t = 2)]
    pub(crate) capacity: u32,
    /// Number of applicants walked through intake (at most 5).
    #[arg(long, default_value_t = 3)]
    pub(crate) applicants: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start,
        capacity,
        applicants,
    } = args;
    let start = start.unwrap_or_else(|| Local::now().date_naive());
    let workflows = Workflows::in_memory(&CohortConfig::default());

    println!("Cohort intake demo");
    let end = start + Duration::days(3);
    let cycle = workflows.enrollment.registry.create_cycle_with_capacity(
        Level::Avanzado,
        start,
        end,
        capacity,
    )?;
    println!(
        "- Opened {} ({}) with {} seats and {} sessions",
        cycle.title(),
        cycle.level.label(),
        cycle.capacity,
        cycle.session_count
    );

    println!("\nIntake");
    for (index, (first_name, last_name)) in APPLICANTS.iter().take(applicants).enumerate() {
        let session = workflows.intake.start().session_id;
        workflows.intake.advance(session)?;
        if index == 0 {
            report_missing_fields(&workflows, session)?;
        }
        fill_application(&workflows, session, first_name, last_name)?;
        let receipt = workflows.intake.submit(session, true)?;
        println!(
            "- {first_name} {last_name} submitted -> registration {}",
            receipt.registration_id
        );
    }

    println!("\nAdmissions queue");
    let queue = workflows.admissions.list(None)?;
    for registration in &queue {
        let view = registration.view();
        println!(
            "- {} | {} | {} | alergias: {}",
            view.full_name,
            view.selected_package.label(),
            view.status,
            view.answers
                .get(&FieldId::new(Disclosure::Allergy.detail_field()))
                .map(String::as_str)
                .unwrap_or("-")
        );
    }

    println!("\nEnrollment");
    let mut students: Vec<StudentId> = Vec::new();
    for registration in queue.iter().rev() {
        workflows.admissions.approve(&registration.id)?;
        match workflows.enrollment.converter.convert(&registration.id, &cycle.id) {
            Ok(receipt) => {
                println!(
                    "- {} seated ({} seats left)",
                    receipt.student.name,
                    receipt.cycle.seats_left()
                );
                students.push(receipt.student.id);
            }
            Err(err @ EnrollmentError::CapacityExceeded { .. }) => {
                println!(
                    "- {} stays pending payment: {err}",
                    registration.snapshot.full_name()
                );
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(first) = students.first() {
        println!("\nAttendance");
        for day in 0..2 {
            workflows.enrollment.attendance.toggle(first, day)?;
        }
    }
    let roster = workflows.enrollment.registry.roster(&cycle.id)?;
    for student in &roster {
        let marks: String = student
            .attendance
            .iter()
            .map(|present| if *present { 'x' } else { '.' })
            .collect();
        println!(
            "- {} [{}] {}% | {}",
            student.name,
            marks,
            student.progress(),
            student.status.label()
        );
    }

    Ok(())
}

fn report_missing_fields(workflows: &Workflows, session: SessionId) -> Result<(), AppError> {
    match workflows.intake.advance(session) {
        Err(IntakeError::Validation(validation)) => {
            let fields: Vec<&str> = validation.fields.iter().map(FieldId::as_str).collect();
            println!(
                "- Empty {} step blocked: {}",
                validation.step.label(),
                fields.join(", ")
            );
            Ok(())
        }
        Err(err) => Err(err.into()),
        Ok(_) => Err(AppError::Demo("empty personal step advanced".to_string())),
    }
}

fn fill_application(
    workflows: &Workflows,
    session: SessionId,
    first_name: &str,
    last_name: &str,
) -> Result<(), AppError> {
    let intake = &workflows.intake;
    let email = format!("{}@example.com", first_name.to_lowercase());
    let birth_date = NaiveDate::from_ymd_opt(1990, 5, 1)
        .ok_or_else(|| AppError::Demo("invalid birth date".to_string()))?;
    let personal = [
        ("firstName", Answer::text(first_name)),
        ("lastName", Answer::text(last_name)),
        ("email", Answer::text(&email)),
        ("phone", Answer::phone("351 555 0101")?),
        ("birthDate", Answer::Date(birth_date)),
        ("city", Answer::text("Córdoba")),
    ];
    for (field, answer) in personal {
        intake.set_answer(session, &FieldId::new(field), answer)?;
    }
    intake.advance(session)?;

    for disclosure in Disclosure::ordered() {
        intake.set_toggle(session, disclosure, Toggle::No)?;
    }
    let medical = [
        ("emergencyName", Answer::text("Contacto de emergencia")),
        ("emergencyPhone", Answer::phone("351 555 0199")?),
        ("intention", Answer::text("Crecer como lider")),
    ];
    for (field, answer) in medical {
        intake.set_answer(session, &FieldId::new(field), answer)?;
    }
    intake.advance(session)?;

    intake.set_answer(session, &FieldId::new(PACKAGE_FIELD), Answer::choice("AVANZADO"))?;
    Ok(())
}
