use std::{io::Write, sync::Arc};

use serde_json::json;
use shared::domain::{Patient, StaffRole, Treatment, TreatmentCategory, UserProfile};

use super::*;
use crate::{
    session::StaticSession,
    store::StoreError,
    test_support::FakeStore,
};

fn signed_in() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::signed_in("u1"))
}

fn treatment_form(store: &Arc<FakeStore>) -> EntityFormController<Treatment> {
    EntityFormController::new(store.clone(), signed_in())
}

fn profile_form(store: &Arc<FakeStore>) -> EntityFormController<UserProfile> {
    EntityFormController::new(store.clone(), signed_in())
}

fn seed_treatment(store: &FakeStore, id: &str, name: &str) {
    store.insert(
        "treatments",
        id,
        json!({"id": id, "name": name, "price": 1500.0, "duration_minutes": 30}),
    );
}

fn seed_profile(store: &FakeStore) {
    store.insert(
        "profiles",
        "u1",
        json!({
            "id": "u1",
            "first_name": "Laura",
            "last_name": "Díaz",
            "email": "laura@clinica.com",
            "role": "admin",
            "photo_url": "https://cdn.example.com/old.png"
        }),
    );
}

#[tokio::test]
async fn new_draft_starts_ready_in_create_mode() {
    let store = FakeStore::new();
    let form = treatment_form(&store);
    assert_eq!(form.snapshot().phase(), &FormPhase::Uninitialized);
    assert_eq!(form.update_field("name", "x"), Err(ClientError::NotReady));

    form.new_draft().expect("new draft");
    let state = form.snapshot();
    assert_eq!(state.phase(), &FormPhase::Ready);
    assert_eq!(state.mode(), FormMode::Create);
    assert!(state.draft().active);
    assert!(!state.is_dirty());
    assert!(state.validation_error().is_none());
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn zero_price_blocks_submit_without_network() {
    let store = FakeStore::new();
    let form = treatment_form(&store);
    form.new_draft().expect("new draft");
    form.update_field("name", "Consulta").expect("name");
    form.update_field("price", "0").expect("price");
    form.update_field("duration_minutes", "30").expect("duration");

    let err = form.submit().await.expect_err("invalid draft");
    assert!(matches!(err, ClientError::Validation(_)));

    let state = form.snapshot();
    assert_eq!(
        state.status(),
        &RequestStatus::Failed("El precio debe ser mayor a 0".into())
    );
    assert_eq!(state.phase(), &FormPhase::Ready);
    assert_eq!(
        state.validation_error().map(|e| e.message.as_str()),
        Some("El precio debe ser mayor a 0")
    );
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn rejected_input_keeps_draft_and_records_field_error() {
    let store = FakeStore::new();
    let form = treatment_form(&store);
    form.new_draft().expect("new draft");
    form.update_field("price", "120").expect("price");

    let err = form.update_field("price", "abc").expect_err("not a number");
    assert!(matches!(err, ClientError::Field(_)));
    let state = form.snapshot();
    assert_eq!(state.draft().price, 120.0);
    assert_eq!(state.field_error("price"), Some("El precio debe ser un número"));

    form.update_field("price", "130,5").expect("fixed");
    let state = form.snapshot();
    assert_eq!(state.draft().price, 130.5);
    assert_eq!(state.field_error("price"), None);

    assert!(matches!(
        form.update_field("id", "t9"),
        Err(ClientError::Field(FieldError::ReadOnly(_)))
    ));
    assert!(matches!(
        form.update_field("colour", "red"),
        Err(ClientError::Field(FieldError::Unknown(_)))
    ));
}

#[tokio::test]
async fn create_resets_draft_and_reports_success() {
    let store = FakeStore::new();
    let form = treatment_form(&store);
    form.new_draft().expect("new draft");
    form.update_field("name", "Limpieza facial").expect("name");
    form.update_field("price", "2500").expect("price");
    form.update_field("duration_minutes", "45").expect("duration");
    form.update_field("category", "aesthetic").expect("category");
    form.update_field("doctor_ids", FieldInput::Ids(vec!["d1".into()])).expect("doctors");

    let saved = form.submit().await.expect("created");
    assert_eq!(saved.id(), Some("new-1"));
    assert_eq!(saved.category, TreatmentCategory::Aesthetic);

    let state = form.snapshot();
    assert_eq!(
        state.status(),
        &RequestStatus::Succeeded("Tratamiento creado correctamente".into())
    );
    assert_eq!(state.mode(), FormMode::Create);
    assert_eq!(state.draft().name, "");
    assert_eq!(store.calls(), vec!["create treatments"]);
}

#[tokio::test]
async fn edit_keeps_server_echo() {
    let store = FakeStore::new();
    seed_treatment(&store, "t1", "Peeling");
    let form = treatment_form(&store);

    form.load_for_edit("t1").await.expect("loaded");
    assert_eq!(form.snapshot().mode(), FormMode::Edit);
    assert!(!form.snapshot().is_dirty());

    form.update_field("name", "Peeling químico").expect("name");
    assert!(form.snapshot().is_dirty());

    let saved = form.submit().await.expect("updated");
    assert_eq!(saved.name, "Peeling químico");

    let state = form.snapshot();
    assert_eq!(
        state.status(),
        &RequestStatus::Succeeded("Tratamiento actualizado correctamente".into())
    );
    assert_eq!(state.draft().name, "Peeling químico");
    assert!(!state.is_dirty());
    assert_eq!(store.count("update treatments/t1"), 1);
}

#[tokio::test]
async fn mutation_failure_keeps_draft_for_retry() {
    let store = FakeStore::new();
    seed_treatment(&store, "t1", "Peeling");
    store.fail("update treatments/t1", StoreError::conflict("El tratamiento fue modificado"));
    let form = treatment_form(&store);
    form.load_for_edit("t1").await.expect("loaded");
    form.update_field("price", "1800").expect("price");

    let err = form.submit().await.expect_err("conflict");
    assert_eq!(err, ClientError::Conflict("El tratamiento fue modificado".into()));
    let state = form.snapshot();
    assert_eq!(state.phase(), &FormPhase::Ready);
    assert_eq!(state.draft().price, 1800.0);
    assert_eq!(
        state.status(),
        &RequestStatus::Failed("El tratamiento fue modificado".into())
    );

    store.clear_failure("update treatments/t1");
    form.submit().await.expect("retry");
    assert_eq!(store.count("update treatments/t1"), 2);
}

#[tokio::test]
async fn failed_upload_skips_mutation() {
    let store = FakeStore::new();
    seed_profile(&store);
    store.fail("upload me.png", StoreError::network("file too large"));
    let form = profile_form(&store);
    form.load_own_profile().await.expect("own profile");

    form.select_asset_bytes("photo_url", "me.png", vec![0x89, 0x50, 0x4e, 0x47])
        .expect("photo selected");
    let err = form.submit().await.expect_err("upload rejected");
    assert_eq!(err, ClientError::Network("file too large".into()));

    let state = form.snapshot();
    assert_eq!(state.status(), &RequestStatus::Failed("file too large".into()));
    assert_eq!(state.phase(), &FormPhase::Ready);
    assert!(state.pending_asset().is_some());
    assert_eq!(store.count("update profiles"), 0);
}

#[tokio::test]
async fn upload_url_is_merged_before_mutation() {
    let store = FakeStore::new();
    seed_profile(&store);
    let form = profile_form(&store);
    form.load_own_profile().await.expect("own profile");

    form.select_asset_bytes("photo_url", "nueva.png", vec![1, 2, 3])
        .expect("photo selected");
    let preview = form.snapshot().preview_for("photo_url").expect("preview");
    assert!(preview.starts_with("data:image/png;base64,"));

    let saved = form.submit().await.expect("saved");
    assert_eq!(saved.photo_url.as_deref(), Some("https://cdn.example.com/nueva.png"));
    assert_eq!(store.calls(), vec!["get profiles/u1", "upload nueva.png", "update profiles/u1"]);

    let uploads = store.uploads();
    assert_eq!(uploads[0].mime_type, "image/png");
    assert_eq!(uploads[0].bytes, vec![1, 2, 3]);

    let state = form.snapshot();
    assert!(state.pending_asset().is_none());
    assert_eq!(
        state.preview_for("photo_url").as_deref(),
        Some("https://cdn.example.com/nueva.png")
    );
}

#[tokio::test]
async fn retry_after_mutation_failure_does_not_reupload() {
    let store = FakeStore::new();
    seed_profile(&store);
    store.fail("update profiles/u1", StoreError::network("timeout"));
    let form = profile_form(&store);
    form.load_own_profile().await.expect("own profile");
    form.select_asset_bytes("photo_url", "me.jpg", vec![7; 4]).expect("photo");

    form.submit().await.expect_err("mutation fails");
    let state = form.snapshot();
    assert!(state.pending_asset().is_none());
    assert_eq!(
        state.draft().photo_url.as_deref(),
        Some("https://cdn.example.com/me.jpg")
    );

    store.clear_failure("update profiles/u1");
    form.submit().await.expect("retry");
    assert_eq!(store.count("upload"), 1);
    assert_eq!(store.count("update profiles/u1"), 2);
}

#[tokio::test]
async fn select_asset_reads_file_from_disk() {
    let store = FakeStore::new();
    seed_profile(&store);
    let form = profile_form(&store).with_max_asset_bytes(16);
    form.load_own_profile().await.expect("own profile");

    let mut small = tempfile::Builder::new().suffix(".png").tempfile().expect("temp file");
    small.write_all(b"png-bytes").expect("write");
    form.select_asset("photo_url", small.path()).await.expect("selected");
    let pending = form.snapshot().pending_asset().cloned().expect("pending");
    assert_eq!(pending.bytes, b"png-bytes");
    assert_eq!(pending.mime_type, "image/png");

    let mut big = tempfile::Builder::new().suffix(".png").tempfile().expect("temp file");
    big.write_all(&[0u8; 64]).expect("write");
    let err = form.select_asset("photo_url", big.path()).await.expect_err("too big");
    assert!(matches!(err, ClientError::Asset(_)));
    assert!(form.snapshot().field_error("photo_url").is_some());

    assert!(matches!(
        form.select_asset("email", small.path()).await,
        Err(ClientError::Asset(_))
    ));
}

#[tokio::test]
async fn oversized_bytes_record_a_field_error() {
    let store = FakeStore::new();
    seed_profile(&store);
    let form = profile_form(&store).with_max_asset_bytes(4);
    form.load_own_profile().await.expect("own profile");
    form.select_asset_bytes("photo_url", "ok.png", vec![1, 2]).expect("within limit");

    let err = form
        .select_asset_bytes("photo_url", "huge.png", vec![0; 32])
        .expect_err("too big");
    assert_eq!(
        err,
        ClientError::Asset("huge.png exceeds the 4 byte upload limit".into())
    );
    let state = form.snapshot();
    assert_eq!(
        state.field_error("photo_url"),
        Some("huge.png exceeds the 4 byte upload limit")
    );
    assert_eq!(state.pending_asset().map(|a| a.filename.as_str()), Some("ok.png"));

    form.select_asset_bytes("photo_url", "small.png", vec![3]).expect("fixed");
    assert_eq!(form.snapshot().field_error("photo_url"), None);
}

#[tokio::test]
async fn double_submit_is_rejected_while_in_flight() {
    let store = FakeStore::new();
    seed_treatment(&store, "t1", "Peeling");
    let form = treatment_form(&store);
    form.load_for_edit("t1").await.expect("loaded");

    let release = store.gate("update treatments/t1");
    let first = form.submit();
    let second = async {
        let result = form.submit().await;
        assert!(form.snapshot().status().is_loading());
        assert!(!form.snapshot().is_editable());
        assert!(matches!(form.update_field("name", "x"), Err(ClientError::NotReady)));
        let _ = release.send(());
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(ClientError::Busy)));
    assert_eq!(store.count("update"), 1);
}

#[tokio::test]
async fn stale_edit_load_is_discarded() {
    let store = FakeStore::new();
    seed_treatment(&store, "t1", "Peeling");
    seed_treatment(&store, "t2", "Rinoplastia");
    let form = treatment_form(&store);

    let release = store.gate("get treatments/t1");
    let slow = form.load_for_edit("t1");
    let fast = async {
        let result = form.load_for_edit("t2").await;
        let _ = release.send(());
        result
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(slow, Err(ClientError::Superseded));
    assert_eq!(fast, Ok(()));
    let state = form.snapshot();
    assert_eq!(state.draft().name, "Rinoplastia");
    assert_eq!(state.phase(), &FormPhase::Ready);
}

#[tokio::test]
async fn missing_entity_enters_not_found() {
    let store = FakeStore::new();
    let form = EntityFormController::<Patient>::new(store.clone(), signed_in());

    let err = form.load_for_edit("p404").await.expect_err("missing");
    assert!(matches!(err, ClientError::NotFound(_)));
    let state = form.snapshot();
    assert_eq!(state.phase(), &FormPhase::NotFound("patients p404 no encontrado".into()));
    assert!(!state.is_editable());
    assert_eq!(form.submit().await.map(|_| ()), Err(ClientError::NotReady));

    store.fail("get patients/p500", StoreError::network("error interno"));
    form.load_for_edit("p500").await.expect_err("failed");
    assert_eq!(
        form.snapshot().phase(),
        &FormPhase::LoadFailed("error interno".into())
    );
}

#[tokio::test]
async fn own_profile_requires_session() {
    let store = FakeStore::new();
    let form = EntityFormController::<UserProfile>::new(
        store.clone(),
        Arc::new(StaticSession::anonymous()),
    );

    assert_eq!(form.load_own_profile().await, Err(ClientError::NoSession));
    assert_eq!(
        form.snapshot().status(),
        &RequestStatus::Failed("No hay una sesión activa".into())
    );
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn doctor_profile_needs_specialty_before_submit() {
    let store = FakeStore::new();
    seed_profile(&store);
    let form = profile_form(&store);
    form.load_own_profile().await.expect("own profile");

    form.update_field("role", "doctor").expect("role");
    assert_eq!(form.snapshot().draft().role, StaffRole::Doctor);
    assert_eq!(
        form.validate().map_err(|e| e.message),
        Err("La especialidad es obligatoria para médicos".to_string())
    );

    form.update_field("specialty", "Dermatología").expect("specialty");
    assert!(form.snapshot().validation_error().is_none());
    form.submit().await.expect("saved");
}

#[tokio::test]
async fn editing_after_failed_submit_clears_status() {
    let store = FakeStore::new();
    let form = treatment_form(&store);
    form.new_draft().expect("new draft");
    form.update_field("name", "Consulta").expect("name");
    form.update_field("price", "0").expect("price");
    form.update_field("duration_minutes", "30").expect("duration");
    form.submit().await.expect_err("invalid");
    assert!(form.snapshot().status().is_failed());

    form.update_field("price", "100").expect("price");
    let state = form.snapshot();
    assert!(state.status().is_idle());
    assert_eq!(state.validation_error(), None);

    form.submit().await.expect("created");
    assert!(matches!(form.snapshot().status(), RequestStatus::Succeeded(_)));
    form.update_field("name", "Control").expect("next draft");
    assert!(form.snapshot().status().is_idle());
}

#[tokio::test]
async fn dismiss_clears_message_only() {
    let store = FakeStore::new();
    let form = treatment_form(&store);
    form.new_draft().expect("new draft");
    form.update_field("name", "Consulta").expect("name");
    form.submit().await.expect_err("invalid");

    form.dismiss();
    let state = form.snapshot();
    assert!(state.status().is_idle());
    assert_eq!(state.draft().name, "Consulta");
}

#[tokio::test]
async fn unmount_drops_in_flight_submit() {
    let store = FakeStore::new();
    seed_treatment(&store, "t1", "Peeling");
    let form = treatment_form(&store);
    form.load_for_edit("t1").await.expect("loaded");
    form.update_field("name", "Otro").expect("name");

    let release = store.gate("update treatments/t1");
    let submit = form.submit();
    let unmount = async {
        form.unmount();
        let _ = release.send(());
    };
    let (result, ()) = tokio::join!(submit, unmount);

    assert!(matches!(result, Err(ClientError::Superseded)));
    assert_eq!(form.snapshot().phase(), &FormPhase::Submitting);
    assert_eq!(form.new_draft(), Err(ClientError::Detached));
}
