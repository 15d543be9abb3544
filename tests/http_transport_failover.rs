//! Multi-endpoint failover against real HTTP servers: a retriable status
//! from the first two configured endpoints rotates the transport onward
//! until the third accepts the write.

use std::time::Duration;

use ilp_sender::config::{Auth, Scheme};
use ilp_sender::{Address, AddressList, HttpTransport, Sender};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn address_of(server: &MockServer) -> Address {
    let url = url::Url::parse(&server.uri()).unwrap();
    Address::new(
        url.host_str().unwrap().to_string(),
        url.port_or_known_default().unwrap(),
    )
}

#[tokio::test]
async fn a_retriable_failure_rotates_to_the_next_endpoint_until_one_accepts() {
    let failing_a = MockServer::start().await;
    let failing_b = MockServer::start().await;
    let healthy_c = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&failing_a)
        .await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&failing_b)
        .await;
    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&healthy_c)
        .await;

    let addresses = AddressList::new(vec![
        address_of(&failing_a),
        address_of(&failing_b),
        address_of(&healthy_c),
    ]);
    let transport = HttpTransport::new(
        addresses,
        Scheme::Http,
        Auth::None,
        false,
        Duration::from_secs(5),
        102_400,
        None,
    )
    .unwrap();

    let options = ilp_sender::Options::builder(Scheme::Http, vec![Address::new("placeholder", 9000)])
        .build()
        .unwrap();
    let mut sender = Sender::new(Box::new(transport), &options);

    sender.table("weather").unwrap();
    sender.symbol("city", "london").unwrap();
    sender.at_now().await.unwrap();
    sender.flush().await.unwrap();

    assert_eq!(sender.row_count(), 0);
    assert_eq!(failing_a.received_requests().await.unwrap().len(), 1);
    assert_eq!(failing_b.received_requests().await.unwrap().len(), 1);
    assert_eq!(healthy_c.received_requests().await.unwrap().len(), 1);
}
