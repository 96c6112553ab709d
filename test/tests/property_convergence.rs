/// PROPERTY-BASED TESTS: convergence
///
/// Whatever edits the server and its clients make, once the links are quiet
/// every client's view matches the server's tree.

use proptest::prelude::*;

use metavoxel_test::{region_edit, LinkConditioner, TestNetwork};

#[derive(Clone, Debug)]
enum Editor {
    Server,
    Client(usize),
}

#[derive(Clone, Debug)]
struct RandomEdit {
    editor: Editor,
    corner: [u8; 3],
    extent: u8,
    value: u32,
}

fn editor_strategy() -> impl Strategy<Value = Editor> {
    prop_oneof![Just(Editor::Server), (0usize..2).prop_map(Editor::Client)]
}

fn edit_strategy() -> impl Strategy<Value = RandomEdit> {
    (editor_strategy(), [0u8..12, 0u8..12, 0u8..12], 1u8..4, 0u32..6).prop_map(
        |(editor, corner, extent, value)| RandomEdit {
            editor,
            corner,
            extent,
            value,
        },
    )
}

fn apply(net: &mut TestNetwork, random: &RandomEdit) {
    let minimum = random.corner.map(f32::from);
    let maximum = minimum.map(|coordinate| coordinate + f32::from(random.extent));
    let edit = region_edit(minimum, maximum, random.value);
    match random.editor {
        Editor::Server => net.server.apply_edit(edit).unwrap(),
        Editor::Client(index) => net.client_mut(index).apply_edit(edit).unwrap(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every client converges on the server's tree over perfect links
    #[test]
    fn prop_clients_converge(edits in prop::collection::vec(edit_strategy(), 1..12)) {
        let mut net = TestNetwork::new();
        net.add_client();
        net.add_client();
        net.tick();

        for random in &edits {
            apply(&mut net, random);
            net.tick();
        }
        net.tick_n(3);

        prop_assert!(net.converged());
        prop_assert_eq!(net.client(0).pending_edit_count(), 0);
    }

    /// Loss while editing does not prevent convergence once the links heal
    #[test]
    fn prop_clients_converge_after_loss(
        edits in prop::collection::vec(edit_strategy(), 1..12),
        seed in any::<u64>(),
    ) {
        let mut net = TestNetwork::new();
        net.add_client_with(
            LinkConditioner::lossy(0.3, seed),
            LinkConditioner::lossy(0.3, seed.wrapping_add(1)),
        );
        net.add_client();
        net.tick();

        for random in &edits {
            apply(&mut net, random);
            net.tick();
        }

        net.clients[0].to_client.set_conditioner(LinkConditioner::perfect());
        net.clients[0].to_server.set_conditioner(LinkConditioner::perfect());
        net.tick_n(40);

        prop_assert!(net.converged());
    }
}
