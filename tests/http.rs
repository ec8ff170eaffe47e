use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use gear_tracker::db::memory::MemoryDb;
use gear_tracker::environment::Environment;
use gear_tracker::log::discard_logger;
use gear_tracker::routes;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct GearResponse {
    id: String,
    name: String,
    category: String,
    brand: String,
    purchase_date: String,
    notes: Option<String>,
    photo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MessageResponse {
    message: String,
}

fn start_server() -> SocketAddr {
    let environment = Environment::new(
        Arc::new(discard_logger()),
        Arc::new(MemoryDb::new()),
    );

    let (address, server) =
        warp::serve(routes::make_routes(environment)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    address
}

fn url_to(address: &SocketAddr, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("http://{}/api/gear/{}", address, suffix),
        None => format!("http://{}/api/gear", address),
    }
}

async fn list(client: &Client, address: &SocketAddr) -> Vec<GearResponse> {
    let response = client
        .get(&url_to(address, None))
        .send()
        .await
        .expect("get gear list");

    assert_eq!(response.status(), StatusCode::OK);

    response.json().await.expect("parse gear list")
}

#[tokio::test]
async fn api_works() {
    let address = start_server();
    let client = Client::new();

    assert!(list(&client, &address).await.is_empty());

    let created = test_create(&client, &address).await;
    test_bad_create(&client, &address).await;
    test_update(&client, &address, &created).await;
    test_delete(&client, &address, &created).await;
}

async fn test_create(client: &Client, address: &SocketAddr) -> GearResponse {
    let response = client
        .post(&url_to(address, None))
        .json(&json!({"name": "SM58", "category": "Microphone", "brand": "Shure"}))
        .send()
        .await
        .expect("post new gear");

    assert_eq!(response.status(), StatusCode::CREATED);

    let created: GearResponse = response.json().await.expect("parse created gear");

    assert_ne!(created.id, "", "response must provide non-blank ID");
    assert_eq!(created.name, "SM58");
    assert_eq!(created.category, "Microphone");
    assert_eq!(created.brand, "Shure");

    let purchase_date =
        OffsetDateTime::parse(&created.purchase_date, &Rfc3339).expect("parse purchaseDate");
    let age = OffsetDateTime::now_utc() - purchase_date;
    assert!(
        age.whole_seconds().abs() < 60,
        "purchaseDate must default to the creation time"
    );

    assert_eq!(list(client, address).await, vec![created.clone()]);

    created
}

async fn test_bad_create(client: &Client, address: &SocketAddr) {
    let before = list(client, address).await;

    let response = client
        .post(&url_to(address, None))
        .json(&json!({"name": "Beta 58A", "category": "Microphone"}))
        .send()
        .await
        .expect("post incomplete gear");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: MessageResponse = response.json().await.expect("parse error response");
    assert_eq!(error.message, "gear validation failed: brand is required");

    assert_eq!(list(client, address).await, before);
}

async fn test_update(client: &Client, address: &SocketAddr, created: &GearResponse) {
    let response = client
        .put(&url_to(address, Some(&created.id)))
        .json(&json!({"notes": "serviced", "name": null}))
        .send()
        .await
        .expect("put notes");

    assert_eq!(response.status(), StatusCode::OK);

    let updated: GearResponse = response.json().await.expect("parse updated gear");
    assert_eq!(
        updated,
        GearResponse {
            notes: Some("serviced".to_owned()),
            ..created.clone()
        }
    );

    let response = client
        .put(&url_to(address, Some(&uuid::Uuid::new_v4().to_string())))
        .json(&json!({"notes": "lost"}))
        .send()
        .await
        .expect("put unknown gear");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(list(client, address).await, vec![updated]);
}

async fn test_delete(client: &Client, address: &SocketAddr, created: &GearResponse) {
    let url = url_to(address, Some(&created.id));

    let response = client.delete(&url).send().await.expect("delete gear");
    assert_eq!(response.status(), StatusCode::OK);

    let deleted: MessageResponse = response.json().await.expect("parse delete response");
    assert_eq!(deleted.message, "Gear deleted");

    let response = client.delete(&url).send().await.expect("delete gear again");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.get(&url).send().await.expect("get deleted gear");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(list(client, address).await.is_empty());
}

#[tokio::test]
async fn concurrent_creations_are_all_kept() {
    let address = start_server();
    let client = Client::new();

    let requests = (0..20).map(|i| {
        let client = client.clone();
        let url = url_to(&address, None);

        async move {
            let response = client
                .post(&url)
                .json(&json!({"name": format!("Pedal {}", i), "category": "Effects", "brand": "Boss"}))
                .send()
                .await
                .expect("post gear");

            assert_eq!(response.status(), StatusCode::CREATED);

            response.json::<Value>().await.expect("parse created gear")
        }
    });

    let created = futures::future::join_all(requests).await;
    assert_eq!(created.len(), 20);

    let listed = list(&client, &address).await;
    let ids: HashSet<_> = listed.iter().map(|g| g.id.clone()).collect();
    let names: HashSet<_> = listed.iter().map(|g| g.name.clone()).collect();

    assert_eq!(ids.len(), 20, "every record must have its own ID");
    assert_eq!(names.len(), 20);
}
