use super::*;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn loopback(retry: Duration) -> (TcpLink, Inbound) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    TcpLink::from_listener(listener, address, retry)
}

#[tokio::test]
async fn memory_link_routes_by_exact_address() {
    let network = MemoryNetwork::new();
    let (a, _a_inbound) = network.join("10.0.0.1:5000");
    let (_b, mut b_inbound) = network.join("10.0.0.1:50000");

    a.send("10.0.0.1:50000", "reqEntry,0,1".to_string());

    let delivery = b_inbound.recv().await.unwrap();
    assert_eq!(
        delivery,
        Delivery {
            from: "10.0.0.1:5000".to_string(),
            payload: "reqEntry,0,1".to_string(),
        }
    );
}

#[tokio::test]
async fn memory_link_drops_unknown_destination() {
    let network = MemoryNetwork::new();
    let (a, mut a_inbound) = network.join("a");

    a.send("nowhere", "respOk,0".to_string());
    network.leave("a");
    a.send("a", "respOk,0".to_string());

    assert!(a_inbound.recv().await.is_none());
}

#[tokio::test]
async fn memory_link_keeps_per_sender_order() {
    let network = MemoryNetwork::new();
    let (a, _) = network.join("a");
    let (_b, mut b_inbound) = network.join("b");

    for i in 0..50 {
        a.send("b", format!("reqEntry,0,{i}"));
    }

    for i in 0..50 {
        assert_eq!(b_inbound.recv().await.unwrap().payload, format!("reqEntry,0,{i}"));
    }
}

#[tokio::test]
async fn tcp_link_attributes_payloads_to_configured_address() {
    let (a, _a_inbound) = loopback(Duration::from_millis(20)).await;
    let (b, mut b_inbound) = loopback(Duration::from_millis(20)).await;

    a.send(b.address(), "reqEntry,0,1".to_string());
    a.send(b.address(), "respOk,0".to_string());

    let first = timeout(WAIT, b_inbound.recv()).await.unwrap().unwrap();
    let second = timeout(WAIT, b_inbound.recv()).await.unwrap().unwrap();

    assert_eq!(first.from, a.address());
    assert_eq!(first.payload, "reqEntry,0,1");
    assert_eq!(second.from, a.address());
    assert_eq!(second.payload, "respOk,0");
}

#[tokio::test]
async fn tcp_link_retries_until_destination_listens() {
    let (a, _a_inbound) = loopback(Duration::from_millis(20)).await;

    let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = reserved.local_addr().unwrap().to_string();
    drop(reserved);

    a.send(&address, "respOk,0".to_string());
    sleep(Duration::from_millis(100)).await;

    let (_b, mut b_inbound) = TcpLink::bind(&address, Duration::from_millis(20))
        .await
        .unwrap();

    let delivery = timeout(WAIT, b_inbound.recv()).await.unwrap().unwrap();
    assert_eq!(delivery.from, a.address());
    assert_eq!(delivery.payload, "respOk,0");
}
