/// Integration tests for session lifetime
///
/// Either side may end a session explicitly, and a side that hears nothing
/// for longer than the disconnection timeout tears the session down.

use metavoxel_client::{ClientError, ErrorEvent};
use metavoxel_server::{ConnectEvent, DisconnectEvent};
use metavoxel_test::{region_edit, TestNetwork};

fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

#[test]
fn connect_is_reported() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.add_client();

    let mut events = net.server.take_events();
    let mut keys: Vec<_> = events.read::<ConnectEvent>().collect();
    keys.sort();
    assert_eq!(keys, vec![net.clients[0].key, net.clients[1].key]);
}

#[test]
fn client_disconnect_reaches_server() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.tick_n(2);
    net.server.take_events();

    let now = net.now;
    net.client_mut(0).disconnect(&now).unwrap();
    assert!(net.client(0).is_closed());
    net.deliver_to_server();

    let mut events = net.server.take_events();
    assert_eq!(
        events.read::<DisconnectEvent>().collect::<Vec<_>>(),
        vec![net.clients[0].key]
    );
    assert_eq!(net.server.client_count(), 0);
    assert_eq!(
        net.client_mut(0)
            .apply_edit(region_edit([0.0; 3], [1.0; 3], 1)),
        Err(ClientError::SessionClosed)
    );
}

#[test]
fn server_disconnect_reaches_client() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.add_client();
    net.tick();

    let key = net.clients[1].key;
    net.server.disconnect(&key, &net.now).unwrap();
    net.deliver_to_clients();

    assert!(!net.client(0).is_closed());
    assert!(net.client(1).is_closed());
    assert_eq!(net.client(1).receive_records().len(), 0);

    // the remaining session carries on
    net.server
        .apply_edit(region_edit([0.0; 3], [2.0; 3], 5))
        .unwrap();
    net.tick_n(2);
    assert!(net.converged());
}

#[test]
fn silent_client_times_out() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.tick();
    net.server.take_events();

    net.advance(11_000);
    net.server.send_updates(&net.now);

    let mut events = net.server.take_events();
    assert_eq!(
        events.read::<DisconnectEvent>().collect::<Vec<_>>(),
        vec![net.clients[0].key]
    );
    assert_eq!(net.server.client_count(), 0);
}

#[test]
fn silent_server_times_out() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.tick();
    net.client_mut(0).take_events();

    net.advance(11_000);
    net.simulate_clients();

    assert!(net.client(0).is_closed());
    let mut events = net.client_mut(0).take_events();
    assert_eq!(
        events.read::<ErrorEvent>().collect::<Vec<_>>(),
        vec![ClientError::TimedOut]
    );
}

#[test]
fn steady_traffic_keeps_sessions_alive() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();

    // well past the disconnection timeout in total
    net.tick_n(400);

    assert!(!net.client(0).is_closed());
    assert_eq!(net.server.client_count(), 1);
    assert!(net.client(0).rtt_millis() >= 0.0);
}
