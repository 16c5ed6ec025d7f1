use std::collections::BTreeSet;

use lutmap::cost::UnitCost;
use lutmap::cut::{Cut, SortOrder};
use lutmap::cut_set::CutSet;
use lutmap::logic::{Gate, LogicNetwork, Signal};
use lutmap::lut_network::LutNetwork;
use lutmap::mapping::Mapping;
use lutmap::params::{CutEnumerationParams, LutMapParams};
use lutmap::traits::Network;
use lutmap::{lut_map, lut_map_inplace, lut_map_inplace_with, lut_map_with, Error};
use proptest::prelude::*;

const HALF_ADDER: &str = "aag 6 2 0 2 3\n2\n4\n10\n6\n6 2 4\n8 3 5\n10 7 9\ni0 a\ni1 b\no0 sum\no1 carry\n";

fn with_cut_size(cut_size: u32) -> LutMapParams {
    LutMapParams {
        cut_enumeration: CutEnumerationParams {
            cut_size,
            ..CutEnumerationParams::default()
        },
        ..LutMapParams::default()
    }
}

fn assignments(num_inputs: usize) -> impl Iterator<Item = Vec<bool>> {
    (0..1usize << num_inputs).map(move |bits| (0..num_inputs).map(|i| bits >> i & 1 == 1).collect())
}

fn equivalent(ntk: &LogicNetwork, luts: &LutNetwork) -> bool {
    luts.num_pis() == ntk.num_pis()
        && luts.num_pos() == ntk.num_pos()
        && assignments(ntk.num_pis()).all(|inputs| ntk.simulate(&inputs) == luts.simulate(&inputs))
}

fn is_terminal(ntk: &LogicNetwork, index: usize) -> bool {
    let node = ntk.index_to_node(index);
    ntk.is_ci(node) || ntk.is_constant(node)
}

/// Checks that the cells cover every output and every cell input is an input, a constant or another cell.
fn check_cover(ntk: &LogicNetwork, mapping: &Mapping, cut_size: Option<usize>) {
    for signal in ntk.outputs() {
        let index = signal.node().index();
        assert!(is_terminal(ntk, index) || mapping.is_cell_root(index), "output driver {} is not covered", index);
    }
    for (root, cell) in mapping.cells() {
        assert!(cell.leaves.windows(2).all(|w| w[0] < w[1]), "cell {} has unsorted leaves", root);
        if let Some(cut_size) = cut_size {
            assert!(cell.leaves.len() <= cut_size, "cell {} has {} leaves", root, cell.leaves.len());
        }
        for &leaf in &cell.leaves {
            assert!(is_terminal(ntk, leaf) || mapping.is_cell_root(leaf), "leaf {} of cell {} is not covered", leaf, root);
        }
    }
}

/// Evaluates the outputs through the cell functions, or `None` if some cell has no function.
fn evaluate_mapping(ntk: &LogicNetwork, mapping: &Mapping, inputs: &[bool]) -> Option<Vec<bool>> {
    let mut values: Vec<Option<bool>> = vec![None; ntk.size()];
    for node in ntk.topological_order() {
        let index = node.index();
        values[index] = match ntk.gate(node) {
            Gate::Zero => Some(false),
            Gate::Input(i) => Some(inputs[i as usize]),
            _ => match (mapping.cell_leaves(index), mapping.cell_function(index)) {
                (Some(leaves), Some(function)) => {
                    let mut minterm = 0;
                    for (i, &leaf) in leaves.iter().enumerate() {
                        let value = values[leaf].unwrap_or_else(|| panic!("leaf {} evaluated before use", leaf));
                        minterm |= usize::from(value) << i;
                    }
                    Some(function.get_bit(minterm))
                },
                (Some(_), None) => return None,
                (None, _) => None,
            },
        };
    }
    Some(
        ntk.outputs()
            .iter()
            .map(|s| values[s.node().index()].unwrap_or_else(|| panic!("output {:?} not evaluated", s)) ^ s.is_complemented())
            .collect(),
    )
}

fn and_tree() -> LogicNetwork {
    let mut ntk = LogicNetwork::new();
    let a = ntk.create_pi();
    let b = ntk.create_pi();
    let c = ntk.create_pi();
    let d = ntk.create_pi();
    let ab = ntk.create_and(a, b);
    let cd = ntk.create_and(c, d);
    let f = ntk.create_and(ab, cd);
    ntk.create_po(f);
    ntk
}

#[test]
fn and_tree_fits_one_lut() {
    let ntk = and_tree();
    let (luts, st) = lut_map(&ntk, &with_cut_size(4)).unwrap();
    assert_eq!(luts.num_luts(), 1);
    assert_eq!(st.area, 1);
    assert_eq!(st.delay, 1);
    assert!(equivalent(&ntk, &luts));
}

#[test]
fn and_tree_with_two_input_luts() {
    let ntk = and_tree();
    let (luts, st) = lut_map(&ntk, &with_cut_size(2)).unwrap();
    assert_eq!(luts.num_luts(), 3);
    assert_eq!(luts.depth(), 2);
    assert_eq!(st.area, 3);
    assert_eq!(st.delay, 2);
    assert!(equivalent(&ntk, &luts));
}

#[test]
fn inverter_chain_is_free() {
    let mut ntk = LogicNetwork::new();
    let a = ntk.create_pi();
    let b1 = ntk.create_buf(!a);
    let b2 = ntk.create_buf(!b1);
    let b3 = ntk.create_buf(!b2);
    let b4 = ntk.create_buf(!b3);
    let b5 = ntk.create_buf(!b4);
    ntk.create_po(b5);
    let (luts, st) = lut_map(&ntk, &LutMapParams::default()).unwrap();
    assert_eq!(st.area, 0);
    assert!(equivalent(&ntk, &luts));
}

#[test]
fn aiger_half_adder() {
    let ntk = LogicNetwork::from_aiger(HALF_ADDER.as_bytes()).unwrap();
    let (luts, st) = lut_map(&ntk, &LutMapParams::default()).unwrap();
    assert_eq!(st.area, 2);
    assert_eq!(st.delay, 1);
    assert!(equivalent(&ntk, &luts));

    let (luts, _) = lut_map_with::<_, UnitCost, true>(&ntk, &LutMapParams::default(), UnitCost).unwrap();
    assert!(equivalent(&ntk, &luts));
}

#[test]
fn invalid_params_are_rejected() {
    let ntk = and_tree();
    assert!(matches!(lut_map(&ntk, &with_cut_size(17)), Err(Error::InvalidParams(_))));
    assert!(matches!(lut_map_inplace(&ntk, &with_cut_size(0)), Err(Error::InvalidParams(_))));
    let mut ps = LutMapParams::default();
    ps.cut_enumeration.cut_limit = 40;
    assert!(matches!(lut_map(&ntk, &ps), Err(Error::InvalidParams(_))));
}

#[test]
fn constant_outputs() {
    let mut ntk = LogicNetwork::new();
    let a = ntk.create_pi();
    let z = ntk.constant(false);
    let f = ntk.create_and(a, z);
    ntk.create_po(f);
    ntk.create_po(!z);
    ntk.create_po(z);
    let (luts, st) = lut_map(&ntk, &LutMapParams::default()).unwrap();
    assert_eq!(st.area, 0);
    assert!(equivalent(&ntk, &luts));
}

/// The largest number of distinct non-constant fanins of any gate.
fn widest_gate(ntk: &LogicNetwork) -> usize {
    ntk.topological_order()
        .into_iter()
        .filter(|&node| !ntk.is_ci(node) && !ntk.is_constant(node))
        .map(|node| {
            ntk.fanins(node)
                .into_iter()
                .map(Signal::node)
                .filter(|&fanin| !ntk.is_constant(fanin))
                .collect::<BTreeSet<_>>()
                .len()
        })
        .max()
        .unwrap_or(0)
}

fn wide_and(num_inputs: usize) -> LogicNetwork {
    let mut ntk = LogicNetwork::new();
    let inputs: Vec<Signal> = (0..num_inputs).map(|_| ntk.create_pi()).collect();
    let f = ntk.create_nary_and(&inputs);
    ntk.create_po(f);
    ntk
}

#[test]
fn gates_wider_than_a_lut_are_rejected() {
    let ntk = wide_and(17);
    match lut_map(&ntk, &LutMapParams::default()) {
        Err(Error::GateTooWide { fanins, cut_size, .. }) => {
            assert_eq!(fanins, 17);
            assert_eq!(cut_size, 6);
        },
        other => panic!("expected a width error, got {:?}", other.err()),
    }

    let ntk = wide_and(8);
    assert!(matches!(lut_map_inplace(&ntk, &with_cut_size(6)), Err(Error::GateTooWide { .. })));
    assert!(matches!(
        lut_map_with::<_, UnitCost, true>(&ntk, &with_cut_size(7), UnitCost),
        Err(Error::GateTooWide { fanins: 8, cut_size: 7, .. })
    ));

    let mut ntk = LogicNetwork::new();
    let a = ntk.create_pi();
    let b = ntk.create_pi();
    let c = ntk.create_pi();
    let f = ntk.create_maj(a, b, !c);
    ntk.create_po(f);
    assert!(matches!(lut_map(&ntk, &with_cut_size(2)), Err(Error::GateTooWide { fanins: 3, .. })));
    assert!(lut_map(&ntk, &with_cut_size(3)).is_ok());
}

#[test]
fn repeated_and_constant_fanins_do_not_count() {
    let mut ntk = LogicNetwork::new();
    let a = ntk.create_pi();
    let b = ntk.create_pi();
    let z = ntk.constant(false);
    let f = ntk.create_nary_xor(&[a, !b, a, z, !z]);
    ntk.create_po(f);
    assert_eq!(widest_gate(&ntk), 2);
    let (luts, _) = lut_map(&ntk, &with_cut_size(2)).unwrap();
    assert!(equivalent(&ntk, &luts));
}

#[test]
fn gates_past_the_fanin_limit_use_their_fanins() {
    let ntk = wide_and(12);
    let mut ps = with_cut_size(12);
    ps.cut_enumeration.fanin_limit = 10;

    let (luts, st) = lut_map(&ntk, &ps).unwrap();
    assert_eq!(luts.num_luts(), 1);
    assert_eq!(st.delay, 1);
    assert!(equivalent(&ntk, &luts));

    let (mapping, _) = lut_map_inplace_with::<_, UnitCost, true>(&ntk, &ps, UnitCost).unwrap();
    assert_eq!(mapping.num_cells(), 1);
    check_cover(&ntk, &mapping, Some(12));
    let root = ntk.outputs()[0].node().index();
    assert_eq!(mapping.cell_leaves(root).map(<[usize]>::len), Some(12));
    for inputs in [vec![true; 12], vec![false; 12]] {
        assert_eq!(evaluate_mapping(&ntk, &mapping, &inputs), Some(ntk.simulate(&inputs)));
    }
}

#[test]
fn collapsed_cones_may_be_wider_than_a_lut() {
    let ntk = wide_and(17);
    let ps = LutMapParams {
        collapse_mffcs: true,
        ..LutMapParams::default()
    };
    let (mapping, _) = lut_map_inplace(&ntk, &ps).unwrap();
    check_cover(&ntk, &mapping, None);
    let root = ntk.outputs()[0].node().index();
    assert_eq!(mapping.cell_leaves(root).map(<[usize]>::len), Some(17));
}

/// A random gate description: kind, fanin choices and complement bits.
///
/// Two- and three-input kinds use the leading choices; n-ary kinds use all of them.
type GateSpec = (u8, Vec<usize>, u8);

fn build(num_inputs: usize, gates: &[GateSpec], outputs: &[(usize, bool)]) -> LogicNetwork {
    let mut ntk = LogicNetwork::new();
    let mut pool: Vec<Signal> = vec![ntk.constant(false)];
    for _ in 0..num_inputs {
        pool.push(ntk.create_pi());
    }
    for (kind, choices, flips) in gates {
        let fanins: Vec<Signal> = choices
            .iter()
            .enumerate()
            .map(|(i, &choice)| {
                let signal = pool[choice % pool.len()];
                if flips >> (i % 8) & 1 == 1 {
                    !signal
                } else {
                    signal
                }
            })
            .collect();
        let (a, b, c) = (fanins[0], fanins[1], fanins[2]);
        let signal = match kind % 6 {
            0 => ntk.create_and(a, b),
            1 => ntk.create_xor(a, b),
            2 => ntk.create_maj(a, b, c),
            3 => ntk.create_or(a, b),
            4 => ntk.create_nary_and(&fanins),
            _ => ntk.create_nary_xor(&fanins),
        };
        pool.push(signal);
    }
    for &(choice, complemented) in outputs {
        // Bias outputs towards the most recent gates.
        let signal = pool[pool.len() - 1 - choice % pool.len()];
        ntk.create_po(if complemented { !signal } else { signal });
    }
    ntk
}

fn network() -> impl Strategy<Value = LogicNetwork> {
    (
        1usize..7,
        prop::collection::vec((any::<u8>(), prop::collection::vec(any::<usize>(), 3..7), any::<u8>()), 1..30),
        prop::collection::vec((0usize..6, any::<bool>()), 1..5),
    )
        .prop_map(|(num_inputs, gates, outputs)| build(num_inputs, &gates, &outputs))
}

fn leaf_set() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::btree_set(0usize..24, 1..7).prop_map(|set: BTreeSet<usize>| set.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn structural_mapping_is_equivalent(ntk in network(), cut_size in 2u32..7) {
        match lut_map(&ntk, &with_cut_size(cut_size)) {
            Ok((luts, _)) => {
                prop_assert!(widest_gate(&ntk) <= cut_size as usize);
                prop_assert!(equivalent(&ntk, &luts));
            },
            Err(err) => {
                prop_assert!(matches!(err, Error::GateTooWide { .. }), "{}", err);
                prop_assert!(widest_gate(&ntk) > cut_size as usize);
            },
        }
    }

    #[test]
    fn function_mapping_is_equivalent(ntk in network(), cut_size in 2u32..7) {
        let res = lut_map_with::<_, UnitCost, true>(&ntk, &with_cut_size(cut_size), UnitCost);
        prop_assert_eq!(res.is_ok(), widest_gate(&ntk) <= cut_size as usize);
        if let Ok((luts, _)) = res {
            prop_assert!(equivalent(&ntk, &luts));
        }
    }

    #[test]
    fn area_oriented_mapping_is_equivalent(ntk in network(), edge_optimization in any::<bool>()) {
        let ps = LutMapParams {
            area_oriented_mapping: true,
            edge_optimization,
            ..with_cut_size(6)
        };
        let (luts, _) = lut_map(&ntk, &ps).unwrap();
        prop_assert!(equivalent(&ntk, &luts));
    }

    #[test]
    fn balanced_mapping_is_equivalent(ntk in network(), sop in any::<bool>()) {
        let ps = LutMapParams {
            sop_balancing: sop,
            esop_balancing: !sop,
            ..LutMapParams::default()
        };
        let (luts, _) = lut_map_with::<_, UnitCost, true>(&ntk, &ps, UnitCost).unwrap();
        prop_assert!(equivalent(&ntk, &luts));
    }

    #[test]
    fn relaxed_delay_mapping_is_equivalent(ntk in network(), relax in 0u32..200, required in 0u32..4) {
        let ps = LutMapParams {
            relax_required: relax,
            required_delay: required,
            ..with_cut_size(6)
        };
        let (luts, _) = lut_map(&ntk, &ps).unwrap();
        prop_assert!(equivalent(&ntk, &luts));
    }

    #[test]
    fn inplace_mapping_covers_the_network(ntk in network(), cut_size in 3u32..7) {
        let res = lut_map_inplace(&ntk, &with_cut_size(cut_size));
        prop_assert_eq!(res.is_ok(), widest_gate(&ntk) <= cut_size as usize);
        if let Ok((mapping, st)) = res {
            check_cover(&ntk, &mapping, Some(cut_size as usize));
            prop_assert!(st.area as usize <= mapping.num_cells());
        }
    }

    #[test]
    fn inplace_functions_are_equivalent(ntk in network()) {
        let (mapping, _) = lut_map_inplace_with::<_, UnitCost, true>(&ntk, &with_cut_size(6), UnitCost).unwrap();
        check_cover(&ntk, &mapping, Some(6));
        for inputs in assignments(ntk.num_pis()) {
            let outputs = evaluate_mapping(&ntk, &mapping, &inputs);
            prop_assert_eq!(outputs, Some(ntk.simulate(&inputs)));
        }
    }

    #[test]
    fn mffc_cells_are_equivalent(ntk in network()) {
        let ps = LutMapParams {
            collapse_mffcs: true,
            ..LutMapParams::default()
        };
        let (mapping, _) = lut_map_inplace_with::<_, UnitCost, true>(&ntk, &ps, UnitCost).unwrap();
        check_cover(&ntk, &mapping, None);
        for inputs in assignments(ntk.num_pis()) {
            if let Some(outputs) = evaluate_mapping(&ntk, &mapping, &inputs) {
                prop_assert_eq!(outputs, ntk.simulate(&inputs));
            }
        }
    }

    #[test]
    fn exact_area_rounds_never_increase_area(ntk in network(), rounds in 0u32..3) {
        let ps = |ela_rounds| LutMapParams {
            area_oriented_mapping: true,
            cut_expansion: false,
            recompute_cuts: false,
            ela_rounds,
            ..with_cut_size(6)
        };
        let (_, before) = lut_map(&ntk, &ps(rounds)).unwrap();
        let (_, after) = lut_map(&ntk, &ps(rounds + 1)).unwrap();
        prop_assert!(after.area <= before.area, "{} > {}", after.area, before.area);
    }

    #[test]
    fn cut_sets_stay_ordered_and_irredundant(
        cuts in prop::collection::vec((leaf_set(), 0u32..5, 0u8..10), 1..48),
        order in prop::sample::select(vec![SortOrder::Delay, SortOrder::Delay2, SortOrder::Area, SortOrder::Area2]),
    ) {
        let mut set = CutSet::new();
        for (leaves, delay, area_flow) in cuts {
            let mut cut = Cut::new(leaves);
            cut.data.delay = delay;
            cut.data.area_flow = f32::from(area_flow);
            if !set.is_dominated(&cut) {
                set.insert(cut, false, order);
            }
        }

        let cuts: Vec<&Cut> = set.iter().collect();
        for (i, a) in cuts.iter().enumerate() {
            for (j, b) in cuts.iter().enumerate() {
                if i != j {
                    prop_assert!(!a.dominates(b), "{:?} dominates {:?}", a.leaves(), b.leaves());
                }
            }
        }
        for pair in cuts.windows(2) {
            prop_assert!(!order.better(pair[1], pair[0]));
        }
    }
}
