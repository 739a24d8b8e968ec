use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, normalize_base_url},
    CatalogItem, Entity, EntityFormController, EntityListController, FieldInput, FilterCriteria,
    HttpRemoteStore, ReferenceController, RemoteStore, RequestStatus, SessionProvider,
    StaticSession,
};
use shared::domain::{Doctor, Patient, Treatment, UserProfile};
use tracing::{info, warn};

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the API root from settings and environment.
    #[arg(long)]
    api_url: Option<String>,
    /// Signed-in user, for commands acting on "my" profile.
    #[arg(long)]
    user_id: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Patients {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        status: String,
    },
    Treatments {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        category: String,
    },
    NewPatient {
        #[arg(long = "set", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
    EditTreatment {
        id: String,
        #[arg(long = "set", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
    TreatmentDoctors {
        id: String,
        #[arg(long)]
        add: Vec<String>,
        #[arg(long)]
        remove: Vec<String>,
    },
    Profile {
        #[arg(long = "set", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
        #[arg(long)]
        photo: Option<PathBuf>,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{raw}`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = normalize_base_url(&api_url)?;
    }
    if cli.user_id.is_some() {
        settings.user_id = cli.user_id;
    }
    info!(api_url = %settings.api_base_url, "admin: settings loaded");

    let store: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::new(&settings)?);
    let session: Arc<dyn SessionProvider> = Arc::new(match settings.user_id.clone() {
        Some(user_id) => StaticSession::signed_in(user_id),
        None => StaticSession::anonymous(),
    });
    let max_upload_bytes = settings.max_upload_bytes;

    match cli.command {
        Command::Patients { search, status } => {
            let criteria = FilterCriteria::search(search).with_facet("status", status.as_str());
            print_list::<Patient>(store, criteria).await?;
        }
        Command::Treatments { search, category } => {
            let criteria =
                FilterCriteria::search(search).with_facet("category", category.as_str());
            print_list::<Treatment>(store, criteria).await?;
        }
        Command::NewPatient { fields } => {
            let form = EntityFormController::<Patient>::new(store, session);
            form.new_draft()?;
            apply_fields(&form, fields)?;
            let saved = submit(&form).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        Command::EditTreatment { id, fields } => {
            let form = EntityFormController::<Treatment>::new(store, session);
            form.load_for_edit(&id).await?;
            apply_fields(&form, fields)?;
            let saved = submit(&form).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        Command::TreatmentDoctors { id, add, remove } => {
            edit_treatment_doctors(store, session, &id, add, remove).await?;
        }
        Command::Profile { fields, photo } => {
            let form = EntityFormController::<UserProfile>::new(store, session)
                .with_max_asset_bytes(max_upload_bytes);
            form.load_own_profile().await?;
            let untouched = fields.is_empty() && photo.is_none();
            apply_fields(&form, fields)?;
            if let Some(path) = photo {
                form.select_asset("photo_url", &path)
                    .await
                    .with_context(|| format!("failed to attach {}", path.display()))?;
            }
            let profile = if untouched {
                form.snapshot().draft().clone()
            } else {
                submit(&form).await?
            };
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }

    Ok(())
}

async fn print_list<E: Entity>(store: Arc<dyn RemoteStore>, criteria: FilterCriteria) -> Result<()> {
    let list = EntityListController::<E>::new(store);
    list.set_filter(criteria);
    let count = list.load().await?;

    let state = list.snapshot();
    info!(resource = E::RESOURCE, count, shown = state.filtered().len(), "admin: list ready");
    if state.is_empty_result() {
        println!("Sin resultados");
    }
    for item in state.filtered() {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(())
}

fn apply_fields<E: Entity>(
    form: &EntityFormController<E>,
    fields: Vec<(String, String)>,
) -> Result<()> {
    for (name, value) in fields {
        form.update_field(&name, value)
            .with_context(|| format!("invalid value for `{name}`"))?;
    }
    Ok(())
}

async fn submit<E: Entity>(form: &EntityFormController<E>) -> Result<E> {
    let result = form.submit().await;
    report(form.snapshot().status());
    Ok(result?)
}

fn report(status: &RequestStatus) {
    if let RequestStatus::Succeeded(message) = status {
        println!("{message}");
    }
}

async fn edit_treatment_doctors(
    store: Arc<dyn RemoteStore>,
    session: Arc<dyn SessionProvider>,
    id: &str,
    add: Vec<String>,
    remove: Vec<String>,
) -> Result<()> {
    let form = EntityFormController::<Treatment>::new(store.clone(), session);
    let doctors = ReferenceController::<Doctor>::new(store);
    futures::try_join!(form.load_for_edit(id), doctors.load_catalog())?;

    let current = form
        .snapshot()
        .draft()
        .doctor_ids
        .iter()
        .map(|doctor_id| doctor_id.to_string())
        .collect();
    doctors.bind(current);

    let changed = !add.is_empty() || !remove.is_empty();
    for doctor_id in &add {
        if !doctors.add(doctor_id) {
            warn!(%doctor_id, "admin: doctor unknown or already assigned");
        }
    }
    for doctor_id in &remove {
        doctors.remove(doctor_id);
    }

    let state = doctors.snapshot();
    let references = state.references();
    for doctor in references.assigned() {
        println!("[x] {} {}", doctor.catalog_id(), doctor.label());
    }
    for doctor in references.available() {
        println!("[ ] {} {}", doctor.catalog_id(), doctor.label());
    }
    for stale in references.stale_ids() {
        warn!(doctor_id = stale, "admin: assigned doctor missing from catalog");
    }

    if changed {
        form.update_field("doctor_ids", FieldInput::Ids(doctors.selected_ids()))?;
        submit(&form).await?;
    }
    Ok(())
}
