use erpx::{ClientConfig, PosClient};
use mockito::Matcher;
use serde_json::{json, Map};

const COMMON: &str = "/xmlrpc/2/common";
const OBJECT: &str = "/xmlrpc/2/object";

fn xml_success(inner: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><methodResponse><params><param>{inner}</param></params></methodResponse>"
    )
}

fn uid_response(uid: i64) -> String {
    xml_success(&format!("<value><int>{uid}</int></value>"))
}

fn pos_client(server: &mockito::ServerGuard) -> PosClient {
    PosClient::from_config(
        ClientConfig::new(&server.url())
            .with_db("shop")
            .with_api_key("top-secret"),
    )
    .unwrap()
}

#[tokio::test]
async fn get_pos_data_issues_the_fixed_call_shape() {
    let mut server = mockito::Server::new_async().await;
    let _auth = server
        .mock("POST", COMMON)
        .with_status(200)
        .with_body(uid_response(7))
        .create_async()
        .await;
    let execute = server
        .mock("POST", OBJECT)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("<string>pos.config</string>.*<string>get_pos_data</string>".to_string()),
            Matcher::Regex("<string>shop</string>.*<boolean>1</boolean>".to_string()),
        ]))
        .with_status(200)
        .with_body(xml_success(
            "<value><array><data><value><struct>\
             <member><name>pos_ID</name><value><int>4</int></value></member>\
             <member><name>pos_name</name><value><string>Front desk</string></value></member>\
             </struct></value></data></array></value>",
        ))
        .expect(1)
        .create_async()
        .await;

    let client = pos_client(&server);
    let data = client.get_pos_data("shop", true).await.unwrap();

    assert_eq!(data, json!([{"pos_ID": 4, "pos_name": "Front desk"}]));
    execute.assert_async().await;
}

#[tokio::test]
async fn get_pos_orders_accepts_bare_id_and_record_identically() {
    let mut server = mockito::Server::new_async().await;
    let _auth = server
        .mock("POST", COMMON)
        .with_status(200)
        .with_body(uid_response(7))
        .create_async()
        .await;

    // Both invocations must produce this exact positional shape:
    // [pos_id, db, limit, include_lines]
    let execute = server
        .mock("POST", OBJECT)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("<string>pos.order</string>.*<string>get_pos_orders</string>".to_string()),
            Matcher::Regex(
                "<value><int>42</int></value>\
                 <value><string>shop</string></value>\
                 <value><int>10</int></value>\
                 <value><boolean>0</boolean></value>"
                    .to_string(),
            ),
        ]))
        .with_status(200)
        .with_body(xml_success(
            "<value><struct>\
             <member><name>newest</name><value><array><data><value><struct>\
             <member><name>name</name><value><string>Order/0001</string></value></member>\
             </struct></value></data></array></value></member>\
             </struct></value>",
        ))
        .expect(2)
        .create_async()
        .await;

    let client = pos_client(&server);

    let from_id = client
        .get_pos_orders(42i64, "shop", 10, false)
        .await
        .unwrap();

    let mut record = Map::new();
    record.insert("id".to_string(), json!(42));
    record.insert("pos_name".to_string(), json!("Front desk"));
    let from_record = client
        .get_pos_orders(record, "shop", 10, false)
        .await
        .unwrap();

    assert_eq!(from_id, from_record);
    assert_eq!(from_id["newest"][0]["name"], json!("Order/0001"));
    execute.assert_async().await;
}

#[tokio::test]
async fn pos_client_exposes_the_generic_client() {
    let mut server = mockito::Server::new_async().await;
    let _auth = server
        .mock("POST", COMMON)
        .with_status(200)
        .with_body(uid_response(11))
        .create_async()
        .await;

    let client = pos_client(&server);
    assert_eq!(client.authenticate().await.unwrap(), 11);
    assert_eq!(client.client().session_id().await, Some(11));
}
