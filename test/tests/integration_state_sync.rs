/// Integration tests for state updates flowing from the server to clients
///
/// Covers differential encoding against advertised baselines, stale and
/// lost updates, and the bounded growth of the record buffers on both ends.

use metavoxel_client::DataReceivedEvent;
use metavoxel_server::ErrorEvent;
use metavoxel_shared::{
    AttributeValue, ConnectionConfig, EditMessage, Region, RegionEdit, MTU_SIZE_BYTES,
};
use metavoxel_test::{region_edit, TestNetwork};

fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// Paints one small fine-grained box per unit cell of a 16 x 8 x 8 block,
/// each with its own value, so the encoded tree runs to many kilobytes
fn paint_speckles(net: &mut TestNetwork) {
    for x in 0..16 {
        for y in 0..8 {
            for z in 0..8 {
                let minimum = [x as f32 + 0.25, y as f32 + 0.25, z as f32 + 0.25];
                let maximum = [minimum[0] + 0.5, minimum[1] + 0.5, minimum[2] + 0.5];
                net.server
                    .apply_edit(EditMessage::SetRegion(RegionEdit::new(
                        Region::new(minimum, maximum),
                        0.25,
                        AttributeValue::new(1 + x * 64 + y * 8 + z),
                    )))
                    .unwrap();
            }
        }
    }
}

#[test]
fn server_edit_reaches_client() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.tick();

    net.server
        .apply_edit(region_edit([0.0; 3], [4.0; 3], 7))
        .unwrap();
    net.tick_n(2);

    assert!(net.converged());
    assert_eq!(net.client(0).data().value_at([1.0; 3]), AttributeValue::new(7));
}

#[test]
fn first_update_is_full_then_differential() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();

    net.tick();
    assert_eq!(net.client(0).last_applied(), Some(0));
    let connection = net.server.connection(&net.clients[0].key).unwrap();
    assert_eq!(connection.applied(), None);

    net.tick();
    assert_eq!(net.client(0).last_applied(), Some(1));
    let connection = net.server.connection(&net.clients[0].key).unwrap();
    assert_eq!(connection.applied(), Some(0));
}

#[test]
fn stale_state_is_discarded() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.client_mut(0).take_events();
    net.clients[0].to_client.hold();

    net.server
        .apply_edit(region_edit([0.0; 3], [4.0; 3], 1))
        .unwrap();
    for _ in 0..11 {
        net.server.send_updates(&net.now);
    }
    net.server
        .apply_edit(region_edit([8.0; 3], [12.0; 3], 2))
        .unwrap();
    net.server.send_updates(&net.now);
    net.server.send_updates(&net.now);

    // packets 0 to 12, one datagram each
    let held = net.clients[0].to_client.take_held();
    assert_eq!(held.len(), 13);
    net.clients[0].to_client.inject(held[12].clone());
    net.clients[0].to_client.inject(held[10].clone());
    net.deliver_to_clients();

    let client = net.client(0);
    assert_eq!(client.last_applied(), Some(12));
    assert_eq!(client.data().value_at([9.0; 3]), AttributeValue::new(2));
    assert_eq!(client.data().value_at([1.0; 3]), AttributeValue::new(1));

    let mut events = net.client_mut(0).take_events();
    assert_eq!(
        events.read::<DataReceivedEvent>().collect::<Vec<_>>(),
        vec![12]
    );
}

#[test]
fn lost_update_is_covered_by_the_next() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    // the client now advertises packet 0 as applied
    net.tick_n(2);
    assert_eq!(net.client(0).last_applied(), Some(1));

    net.clients[0].to_client.hold();
    let regions = [
        ([0.0; 3], [2.0; 3]),
        ([4.0; 3], [6.0; 3]),
        ([8.0; 3], [10.0; 3]),
    ];
    for (value, (minimum, maximum)) in regions.into_iter().enumerate() {
        net.server
            .apply_edit(region_edit(minimum, maximum, value as u32 + 1))
            .unwrap();
        net.server.send_updates(&net.now);
    }

    let held = net.clients[0].to_client.take_held();
    assert_eq!(held.len(), 3);
    net.clients[0].to_client.inject(held[0].clone());
    net.clients[0].to_client.inject(held[2].clone());
    net.deliver_to_clients();

    let client = net.client(0);
    assert_eq!(client.last_applied(), Some(4));
    assert!(client.data().same_content(net.server.data()));
    assert_eq!(client.data().value_at([5.0; 3]), AttributeValue::new(2));

    // the relayed edit carried by the lost packet is resent
    net.tick_n(20);
    assert!(net.converged());
}

#[test]
fn record_buffers_stay_small() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();

    for tick in 0..200u32 {
        if tick % 10 == 0 {
            let corner = (tick % 12) as f32;
            net.server
                .apply_edit(region_edit([corner; 3], [corner + 2.0; 3], tick))
                .unwrap();
        }
        net.tick();

        assert!(net.client(0).receive_records().len() <= 3);
        let connection = net.server.connection(&net.clients[0].key).unwrap();
        assert!(connection.send_record_count() <= 3);
    }
    assert!(net.converged());
}

#[test]
fn delayed_update_is_ignored() {
    init_logger();
    let mut net = TestNetwork::new();
    net.add_client();
    net.tick_n(3);

    // an update delivered after the client has applied newer ones
    net.clients[0].to_client.hold();
    net.server
        .apply_edit(region_edit([0.0; 3], [4.0; 3], 3))
        .unwrap();
    net.server.send_updates(&net.now);
    let delayed = net.clients[0].to_client.take_held();

    net.tick_n(4);
    let last_applied = net.client(0).last_applied();
    for datagram in delayed {
        net.clients[0].to_client.inject(datagram);
    }
    net.deliver_to_clients();
    assert_eq!(net.client(0).last_applied(), last_applied);
    net.tick_n(2);

    assert!(net.converged());
}

#[test]
fn state_too_large_for_one_packet_still_arrives() {
    init_logger();
    let mut net = TestNetwork::new();
    paint_speckles(&mut net);
    let full = net.server.data().to_delta_bytes(None);
    let max_fragments = ConnectionConfig::default().max_fragments_per_packet;
    assert!(full.len() > usize::from(max_fragments) * MTU_SIZE_BYTES);

    net.add_client();
    let mut ticks = 0;
    while net.client(0).last_applied().is_none() {
        assert!(ticks < 2000, "snapshot never arrived");
        net.tick();
        ticks += 1;
    }
    net.tick_n(3);
    assert!(net.converged());

    let key = net.clients[0].key;
    let connection = net.server.connection(&key).unwrap();
    assert_eq!(connection.pending_snapshot(), None);
    assert!(connection.applied().is_some());
    let mut events = net.server.take_events();
    assert_eq!(events.read::<ErrorEvent>().count(), 0);

    // later changes ride on ordinary deltas against the snapshot
    net.server
        .apply_edit(region_edit([8.0; 3], [12.0; 3], 9000))
        .unwrap();
    net.tick_n(3);
    assert!(net.converged());
    assert_eq!(net.client(0).data().value_at([9.0; 3]), AttributeValue::new(9000));
}
