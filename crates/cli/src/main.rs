use clap::{Parser, Subcommand};
use clinic_core::config::{
    paused_stale_after_from_env_value, paused_visit_policy_from_env_value,
    specialty_profiles_from_env_value,
};
use clinic_core::{
    ClinicStore, CoreConfig, PatientService, SpecialtyProfile, VisitService, YamlFileStore,
    DEFAULT_DATA_DIR,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic visit records CLI")]
struct Cli {
    /// Directory holding the YAML record store
    #[arg(long, env = "CLINIC_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Comma-separated specialty profiles for new visits
    #[arg(long, env = "CLINIC_SPECIALTY_PROFILES")]
    profiles: Option<String>,

    /// What start-visit does with a paused visit: surface or auto-resume
    #[arg(long, env = "CLINIC_PAUSED_VISIT_POLICY")]
    paused_policy: Option<String>,

    /// Hours after which a paused visit is flagged as stale
    #[arg(long, env = "CLINIC_PAUSED_STALE_HOURS")]
    stale_hours: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    ListPatients,
    /// Register a patient
    AddPatient {
        first_name: String,
        last_name: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Start a visit, or pick up the patient's open one
    StartVisit {
        patient_id: i64,
        symptom: String,
        /// How long the symptom has been present
        #[arg(long, default_value = "")]
        duration: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Pause an active visit
    PauseVisit { visit_id: i64 },
    /// Resume a paused visit
    ResumeVisit { visit_id: i64 },
    /// End a visit
    EndVisit { visit_id: i64 },
    /// Add a clinical entry to a visit
    AddEntry {
        visit_id: i64,
        section: String,
        content: String,
        /// Specialty profile the entry belongs to
        #[arg(long, default_value = "generic")]
        profile: String,
        /// Overrides the profile's system tag
        #[arg(long)]
        system_code: Option<String>,
    },
    /// List paused visits, longest paused first
    Paused,
    /// Show the sections new visits are created with
    Sections,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'clinic --help' for commands");
        return Ok(());
    };

    let cfg = Arc::new(CoreConfig::new(
        cli.data_dir.clone(),
        specialty_profiles_from_env_value(cli.profiles)?,
        paused_visit_policy_from_env_value(cli.paused_policy)?,
        paused_stale_after_from_env_value(cli.stale_hours)?,
    )?);

    let store: Arc<dyn ClinicStore> = Arc::new(YamlFileStore::open(cfg.data_dir())?);
    let patients = PatientService::new(store.clone());
    let visits = VisitService::new(cfg.clone(), store);

    match command {
        Commands::ListPatients => {
            let list = patients.list_patients()?;
            if list.is_empty() {
                println!("No patients found.");
            } else {
                for patient in list {
                    println!(
                        "ID: {}, Name: {}, Created: {}",
                        patient.id,
                        patient.full_name(),
                        patient.created_at
                    );
                }
            }
        }
        Commands::AddPatient {
            first_name,
            last_name,
            birth_date,
            phone,
        } => {
            let patient = patients.create_patient(
                &first_name,
                &last_name,
                birth_date.as_deref(),
                phone.as_deref(),
            )?;
            println!("Registered patient {} ({})", patient.id, patient.full_name());
        }
        Commands::StartVisit {
            patient_id,
            symptom,
            duration,
            note,
        } => {
            let result =
                visits.start_or_resume_visit(patient_id, &symptom, &duration, note.as_deref())?;
            if result.has_paused_visit {
                if let Some(paused) = result.paused_visit_id {
                    println!(
                        "Patient {} has paused visit {}; run 'clinic resume-visit {}' to continue it",
                        result.patient_id, paused, paused
                    );
                }
            } else if result.is_resumed {
                println!("Resumed visit {}", result.visit_id);
            } else {
                println!(
                    "Visit {} open since {}",
                    result.visit_id, result.started_at
                );
            }
        }
        Commands::PauseVisit { visit_id } => {
            let visit = visits.pause_visit(visit_id)?;
            println!("Visit {} is {}", visit.id(), visit.state());
        }
        Commands::ResumeVisit { visit_id } => {
            let visit = visits.resume_visit(visit_id)?;
            println!("Visit {} is {}", visit.id(), visit.state());
        }
        Commands::EndVisit { visit_id } => {
            let visit = visits.end_visit(visit_id)?;
            if let Some(ended_at) = visit.ended_at() {
                println!("Visit {} ended at {}", visit.id(), ended_at);
            }
        }
        Commands::AddEntry {
            visit_id,
            section,
            content,
            profile,
            system_code,
        } => {
            let profile: SpecialtyProfile = profile.parse()?;
            let entry = visits.add_entry(
                visit_id,
                profile,
                &section,
                &content,
                system_code.as_deref(),
            )?;
            println!(
                "Added {} entry to '{}' on visit {}",
                entry.system_code, entry.section, visit_id
            );
        }
        Commands::Paused => {
            let paused = visits.list_paused_visits(chrono::Utc::now())?;
            if paused.is_empty() {
                println!("No paused visits.");
            }
            for summary in paused {
                println!(
                    "Visit {} for {} (patient {}), paused {}{}",
                    summary.visit_id,
                    summary.patient_name,
                    summary.patient_id,
                    summary.paused_at,
                    if summary.is_stale { " [stale]" } else { "" }
                );
            }
        }
        Commands::Sections => {
            let names: Vec<&str> = cfg.specialty_profiles().iter().map(|p| p.name()).collect();
            if names.is_empty() {
                println!("Profiles: (generic only)");
            } else {
                println!("Profiles: {}", names.join(", "));
            }
            for section in visits.active_sections() {
                println!("  {}", section);
            }
        }
    }

    Ok(())
}
