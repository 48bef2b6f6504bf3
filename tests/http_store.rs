use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use hospadmin::{
    entities::{Doctor, Pharmacist},
    error::ListError,
    remote::{
        http::{HttpConfig, HttpRecordStore, Routes},
        RecordStore, StoreError,
    },
    runtime::handle::{spawn_list_manager, ManagerConfig},
    types::RouteStyle,
    view::projection::Presence,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Backend {
    doctors: Arc<Mutex<Vec<Doctor>>>,
    next: Arc<AtomicU64>,
}

async fn list_doctors(State(b): State<Backend>) -> Json<Vec<Doctor>> {
    Json(b.doctors.lock().await.clone())
}

async fn add_doctor(
    State(b): State<Backend>,
    Json(mut doc): Json<Doctor>,
) -> (StatusCode, Json<Doctor>) {
    let n = b.next.fetch_add(1, Ordering::SeqCst) + 1;
    doc.id = Some(format!("65f0c0de{n:016x}"));
    b.doctors.lock().await.push(doc.clone());
    (StatusCode::CREATED, Json(doc))
}

// Replies with an acknowledgement rather than the record.
async fn update_doctor(
    State(b): State<Backend>,
    Path(id): Path<String>,
    Json(doc): Json<Doctor>,
) -> Result<Json<Value>, StatusCode> {
    let mut doctors = b.doctors.lock().await;
    let slot = doctors
        .iter_mut()
        .find(|d| d.id.as_deref() == Some(id.as_str()))
        .ok_or(StatusCode::NOT_FOUND)?;
    *slot = Doctor {
        id: Some(id),
        ..doc
    };
    Ok(Json(json!({ "message": "Doctor updated" })))
}

async fn delete_doctor(State(b): State<Backend>, Path(id): Path<String>) -> StatusCode {
    let mut doctors = b.doctors.lock().await;
    let before = doctors.len();
    doctors.retain(|d| d.id.as_deref() != Some(id.as_str()));
    if doctors.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database offline")
}

fn app(backend: Backend) -> Router {
    Router::new()
        .route("/api/doctors/all", get(list_doctors))
        .route("/api/doctors/add", post(add_doctor))
        .route("/api/doctors/:id", put(update_doctor).delete(delete_doctor))
        .route("/api/pharmacists", get(broken).post(broken))
        .with_state(backend)
}

async fn serve(router: Router) -> HttpConfig {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    HttpConfig {
        base_url: format!("http://{addr}/api"),
        timeout_ms: Some(5_000),
    }
}

fn doctor(name: &str, specialization: &str) -> Doctor {
    Doctor {
        id: None,
        doctor_id: format!("D-{name}"),
        name: name.to_string(),
        specialization: specialization.to_string(),
        contact_number: "555-0200".to_string(),
        email: format!("{}@hospital.example.com", name.to_lowercase()),
        address: "1 Main St".to_string(),
    }
}

#[test]
fn routes_follow_entity_style() {
    let doctors = Routes::for_entity::<Doctor>("http://localhost:5000/api/");
    assert_eq!(doctors.list, "http://localhost:5000/api/doctors/all");
    assert_eq!(doctors.create, "http://localhost:5000/api/doctors/add");
    assert_eq!(
        doctors.item(&"abc").expect("url").as_str(),
        "http://localhost:5000/api/doctors/abc"
    );

    let pharmacists = Routes::for_entity::<Pharmacist>("http://localhost:5000/api");
    assert_eq!(pharmacists.list, "http://localhost:5000/api/pharmacists");
    assert_eq!(pharmacists.create, pharmacists.list);
    assert_eq!(
        pharmacists.item(&7).expect("url").as_str(),
        "http://localhost:5000/api/pharmacists/7"
    );
}

#[test]
fn item_url_escapes_key_as_one_segment() {
    let routes = Routes::new("http://h/api", "outpatients", RouteStyle::Conventional);
    assert_eq!(
        routes.item(&"OP-1").expect("url").as_str(),
        "http://h/api/outpatients/OP-1"
    );

    let url = routes.item(&"OP/7?x#y").expect("url");
    assert_eq!(url.as_str(), "http://h/api/outpatients/OP%2F7%3Fx%23y");
    assert_eq!(url.query(), None);
    assert_eq!(url.fragment(), None);
    assert_eq!(url.path_segments().expect("segments").count(), 3);
}

#[test]
fn item_url_rejects_unparsable_base() {
    let routes = Routes::new("not a url", "outpatients", RouteStyle::Conventional);
    assert!(matches!(routes.item(&"OP-1"), Err(StoreError::Message(_))));
}

#[test]
fn config_fills_defaults_from_partial_json() {
    let cfg: HttpConfig = serde_json::from_str(r#"{ "timeout_ms": 250 }"#).expect("config");
    assert_eq!(cfg.base_url, "http://localhost:5000/api");
    assert_eq!(cfg.timeout_ms, Some(250));
}

#[tokio::test]
async fn doctor_crud_against_verb_routes() {
    let config = serve(app(Backend::default())).await;
    let store = HttpRecordStore::<Doctor>::new(&config).expect("client");

    let created = store
        .create(doctor("Smith", "Cardiology"))
        .await
        .expect("create");
    let id = created.id.clone().expect("server assigned _id");

    let mut edited = created.clone();
    edited.specialization = "Neurology".to_string();
    let echoed = store.update(&id, edited.clone()).await.expect("update");
    assert_eq!(echoed, edited);

    assert_eq!(store.list_all().await.expect("list"), vec![edited]);

    store.delete(&id).await.expect("delete");
    assert!(store.list_all().await.expect("list").is_empty());
    assert!(matches!(
        store.delete(&id).await,
        Err(StoreError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn server_errors_surface_as_status() {
    let config = serve(app(Backend::default())).await;
    let store = HttpRecordStore::<Pharmacist>::new(&config).expect("client");

    let err = store.list_all().await.unwrap_err();
    let StoreError::Status { status, body } = err else {
        panic!("expected status error, got {err:?}");
    };
    assert_eq!(status, 500);
    assert_eq!(body, "database offline");
}

#[tokio::test]
async fn manager_over_http_creates_edits_and_removes() {
    let backend = Backend::default();
    let config = serve(app(backend.clone())).await;
    let handle = spawn_list_manager(
        HttpRecordStore::<Doctor>::new(&config).expect("client"),
        ManagerConfig::default(),
    );
    assert_eq!(handle.load().await.expect("load"), 0);

    handle.begin_create().await.expect("open");
    handle.set_field("doctorID", "D-7").await.expect("doctorID");
    handle.set_field("name", "House").await.expect("name");
    handle
        .set_field("specialization", "Diagnostics")
        .await
        .expect("specialization");
    let saved = handle.submit().await.expect("submit");
    let id = saved.id.clone().expect("assigned id");

    handle.begin_edit(id.clone()).await.expect("edit");
    handle.set_field("address", "221B").await.expect("address");
    handle.submit().await.expect("update");

    let snap = handle.snapshot().await.expect("snapshot");
    assert_eq!(snap.projection.rows.len(), 1);
    assert_eq!(snap.projection.rows[0].address, "221B");
    assert_eq!(backend.doctors.lock().await[0].address, "221B");

    let request = handle.request_removal(id).await.expect("request");
    assert_eq!(
        request.prompt(),
        "Are you sure you want to delete Dr. House?"
    );
    request.confirm().await.expect("remove");
    assert_eq!(
        handle.snapshot().await.expect("snapshot").presence,
        Presence::Empty
    );
}

#[tokio::test]
async fn manager_reports_unavailable_when_backend_fails() {
    let config = serve(app(Backend::default())).await;
    let handle = spawn_list_manager(
        HttpRecordStore::<Pharmacist>::new(&config).expect("client"),
        ManagerConfig::default(),
    );

    assert!(matches!(handle.load().await, Err(ListError::Transport(_))));
    assert_eq!(
        handle.snapshot().await.expect("snapshot").presence,
        Presence::Unavailable
    );
}
