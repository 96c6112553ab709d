/// Integration tests for client edits
///
/// Local edits must be visible at once, reach the server in the order they
/// were made whatever order their datagrams arrive in, and be relayed to
/// every other client.

use metavoxel_client::EditAppliedEvent;
use metavoxel_server::EditEvent;
use metavoxel_shared::{AttributeValue, EditMessage, NodePath, NodeReplacement};
use metavoxel_test::{region_edit, LinkConditioner, TestNetwork};

fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

#[test]
fn local_edit_is_relayed_to_other_clients() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.add_client();
    net.tick_n(2);
    net.server.take_events();

    let edit = region_edit([0.0; 3], [4.0; 3], 9);
    net.client_mut(0).apply_edit(edit.clone()).unwrap();

    // visible locally before anything is sent
    assert_eq!(net.client(0).data().value_at([1.0; 3]), AttributeValue::new(9));
    assert_eq!(net.client(0).pending_edit_count(), 1);
    assert_eq!(net.client(1).data().value_at([1.0; 3]), AttributeValue::EMPTY);
    let mut events = net.client_mut(0).take_events();
    assert_eq!(
        events.read::<EditAppliedEvent>().collect::<Vec<_>>(),
        vec![edit.clone()]
    );

    net.tick();
    let origin = net.clients[0].key;
    let mut events = net.server.take_events();
    assert_eq!(
        events.read::<EditEvent>().collect::<Vec<_>>(),
        vec![(origin, edit)]
    );
    assert_eq!(net.server.data().value_at([1.0; 3]), AttributeValue::new(9));
    assert_eq!(net.client(1).data().value_at([1.0; 3]), AttributeValue::new(9));

    net.tick_n(2);
    assert_eq!(net.client(0).pending_edit_count(), 0);
    assert!(net.converged());
}

#[test]
fn edit_survives_an_update_sent_before_it_arrived() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.tick_n(2);

    // the server answers before the edit reaches it
    net.client_mut(0)
        .apply_edit(region_edit([0.0; 3], [4.0; 3], 4))
        .unwrap();
    net.clients[0].to_server.hold();
    net.simulate_clients();
    net.server.send_updates(&net.now);
    net.deliver_to_clients();

    assert_eq!(net.client(0).data().value_at([1.0; 3]), AttributeValue::new(4));
    assert_eq!(net.client(0).confirmed().value_at([1.0; 3]), AttributeValue::EMPTY);

    net.clients[0].to_server.release();
    net.deliver_to_server();
    net.tick_n(2);
    assert_eq!(net.client(0).pending_edit_count(), 0);
    assert!(net.converged());
}

#[test]
fn edits_are_merged_in_send_order() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.tick();
    net.server.take_events();

    net.clients[0].to_server.hold();
    let edits: Vec<EditMessage> = (1..=3)
        .map(|value| region_edit([0.0; 3], [4.0; 3], value))
        .collect();
    for edit in &edits {
        net.client_mut(0).apply_edit(edit.clone()).unwrap();
        net.simulate_clients();
    }

    let held = net.clients[0].to_server.take_held();
    assert_eq!(held.len(), 3);
    for index in [2, 0, 1] {
        net.clients[0].to_server.inject(held[index].clone());
    }
    net.deliver_to_server();

    let mut events = net.server.take_events();
    let merged: Vec<EditMessage> = events.read::<EditEvent>().map(|(_, edit)| edit).collect();
    assert_eq!(merged, edits);
    assert_eq!(net.server.data().value_at([1.0; 3]), AttributeValue::new(3));
}

#[test]
fn invalid_local_edit_is_never_sent() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.tick();

    // removing the root is refused locally, so nothing is ever sent
    let removal = EditMessage::Replace(vec![NodeReplacement {
        path: NodePath::root(),
        node: None,
    }]);
    assert!(net.client_mut(0).apply_edit(removal).is_err());
    assert_eq!(net.client(0).pending_edit_count(), 0);
    net.tick();
    assert!(!net.server.take_events().has::<EditEvent>());
}

#[test]
fn clients_converge_under_loss() {
    init_logger();
    let mut net = TestNetwork::new();
    let lossy = net.add_client_with(
        LinkConditioner::new(0.2, 0.1, 11),
        LinkConditioner::lossy(0.2, 12),
    );
    net.add_client();

    for tick in 0..40u32 {
        let corner = (tick % 12) as f32;
        let edit = region_edit([corner; 3], [corner + 3.0; 3], tick + 1);
        match tick % 3 {
            0 => net.client_mut(lossy).apply_edit(edit).unwrap(),
            1 => net.client_mut(1).apply_edit(edit).unwrap(),
            _ => net.server.apply_edit(edit).unwrap(),
        }
        net.tick();
    }

    net.clients[lossy]
        .to_client
        .set_conditioner(LinkConditioner::perfect());
    net.clients[lossy]
        .to_server
        .set_conditioner(LinkConditioner::perfect());
    net.tick_n(60);

    assert!(net.clients[lossy].to_client.dropped_count() > 0);
    assert!(net.converged());
    assert_eq!(net.client(lossy).pending_edit_count(), 0);
}
