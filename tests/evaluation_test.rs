use std::borrow::Cow;

use float_cmp::assert_approx_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use synthgraph::ops::by_name;
use synthgraph::{Elementwise, Graph, GraphError, Integration, Repeat, Storage, Sum};

fn random_vec(rng: &mut StdRng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-10.0..10.0)).collect()
}

#[test]
fn input_leaf_is_identity() {
    let mut rng = StdRng::seed_from_u64(33);
    for len in [0, 1, 7, 64] {
        let data = random_vec(&mut rng, len);
        let mut graph = Graph::new();
        let leaf = graph.add_input(data.clone());

        let ptr = {
            let result = graph.evaluate(leaf).unwrap();
            assert_eq!(&*result, data.as_slice());
            result.as_ptr()
        };
        assert_eq!(ptr, graph.data(leaf).unwrap().as_ptr());
    }
}

#[test]
fn sum_of_k_inputs() {
    let mut rng = StdRng::seed_from_u64(7);
    for k in 1..6 {
        let n = 16;
        let vectors: Vec<Vec<f64>> = (0..k).map(|_| random_vec(&mut rng, n)).collect();

        let mut graph = Graph::new();
        let inputs: Vec<_> = vectors.iter().map(|v| graph.add_input(v.clone())).collect();
        let sum = graph.add_seeded(Sum, &inputs, vec![0.0; n]).unwrap();

        let result = graph.evaluate(sum).unwrap();
        for j in 0..n {
            let expected: f64 = vectors.iter().map(|v| v[j]).sum();
            assert_approx_eq!(f64, result[j], expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn integration_of_unit_triangles() {
    let mut graph = Graph::new();
    let values = graph.add_input(vec![0.0, 1.0, 0.0]);
    let bins = graph.add_input(vec![0.0, 1.0, 2.0]);
    let integral = graph
        .add_node(Integration, &[values, bins], Storage::Persistent)
        .unwrap();

    assert_eq!(&*graph.evaluate(integral).unwrap(), &[1.0]);
    assert_eq!(graph.size(integral), Some(1));
}

#[test]
fn integral_broadcast_back_to_vector() {
    let mut graph = Graph::new();
    let values = graph.add_input(vec![2.0, 2.0, 2.0]);
    let bins = graph.add_input(vec![0.0, 0.5, 1.5]);
    let integral = graph
        .add_node(Integration, &[values, bins], Storage::Fresh)
        .unwrap();
    let repeated = graph
        .add_node(Repeat::new(4), &[integral], Storage::Fresh)
        .unwrap();

    let result = graph.evaluate(repeated).unwrap().into_owned();
    assert_eq!(result, vec![3.0; 4]);
    assert_eq!(graph.stats().allocated, graph.stats().released + 1);
}

#[test]
fn sin_and_cosh_over_edge_case_vectors() {
    let mut rng = StdRng::seed_from_u64(1);
    let cases = vec![
        vec![],
        vec![0.5],
        vec![-3.0, -0.25, -1e-9],
        random_vec(&mut rng, 100),
    ];

    for xs in cases {
        for (name, f) in [("sin", f64::sin as fn(f64) -> f64), ("cosh", f64::cosh)] {
            let mut graph = Graph::new();
            let leaf = graph.add_input(xs.clone());
            let node = graph
                .add_operation(by_name(name).unwrap(), &[leaf], Storage::Fresh)
                .unwrap();

            let result = graph.evaluate(node).unwrap();
            assert_eq!(result.len(), xs.len());
            for (got, x) in result.iter().zip(&xs) {
                assert_approx_eq!(f64, *got, f(*x), ulps = 2);
            }
        }
    }
}

#[test]
fn buffers_are_released_exactly_once() {
    // sum(sin(a), cosh(b), product(a, b)) with every intermediate fresh
    let mut graph = Graph::new();
    let a = graph.add_input(vec![0.1, 0.2, 0.3]);
    let b = graph.add_input(vec![1.0, 2.0, 3.0]);
    let sin = graph.add_node(Elementwise::sin(), &[a], Storage::Fresh).unwrap();
    let cosh = graph.add_node(Elementwise::cosh(), &[b], Storage::Fresh).unwrap();
    let product = graph
        .add_operation(by_name("product").unwrap(), &[a, b], Storage::Fresh)
        .unwrap();
    let sum = graph
        .add_node(Sum, &[sin, cosh, product], Storage::Fresh)
        .unwrap();

    for round in 1..=3 {
        let result = graph.evaluate(sum).unwrap();
        assert!(matches!(result, Cow::Owned(_)));
        drop(result);

        let stats = graph.stats();
        assert_eq!(stats.allocated, 4 * round);
        assert_eq!(stats.released, 3 * round);
        // leaves still own their payloads
        assert_eq!(graph.data(a), Some(&[0.1, 0.2, 0.3][..]));
    }

    graph.reset_stats();
    assert_eq!(graph.stats().allocated, 0);
}

#[test]
fn mutated_leaf_updates_result_without_new_persistent_buffers() {
    let mut graph = Graph::new();
    let a = graph.add_input(vec![0.0, 1.0]);
    let b = graph.add_input(vec![1.0, 1.0]);
    let sin = graph
        .add_node(Elementwise::sin(), &[a], Storage::Persistent)
        .unwrap();
    let cosh = graph
        .add_node(Elementwise::cosh(), &[b], Storage::Persistent)
        .unwrap();
    let sum = graph.add_node(Sum, &[sin, cosh], Storage::Fresh).unwrap();

    let first = graph.evaluate(sum).unwrap().into_owned();
    let pointers = (
        graph.data(sin).unwrap().as_ptr(),
        graph.data(cosh).unwrap().as_ptr(),
    );

    graph.data_mut(a).unwrap()[0] = 2.0;
    let second = graph.evaluate(sum).unwrap().into_owned();

    assert_approx_eq!(f64, first[0], 0.0f64.sin() + 1.0f64.cosh(), ulps = 4);
    assert_approx_eq!(f64, second[0], 2.0f64.sin() + 1.0f64.cosh(), ulps = 4);
    assert_eq!(first[1], second[1]);
    assert_eq!(
        pointers,
        (
            graph.data(sin).unwrap().as_ptr(),
            graph.data(cosh).unwrap().as_ptr()
        )
    );
    // only the fresh root is allocated, once per evaluation
    assert_eq!(graph.stats().allocated, 2);
    assert_eq!(graph.stats().released, 0);
}

#[test]
fn cyclic_graph_is_rejected_before_evaluation() {
    let mut graph = Graph::new();
    let a = graph.add_input(vec![1.0]);
    let first = graph.add_node(Sum, &[a], Storage::Persistent).unwrap();
    let second = graph.add_node(Sum, &[first], Storage::Persistent).unwrap();
    graph.connect(second, first).unwrap();

    let err = graph.evaluate(second).unwrap_err();
    assert!(matches!(err, GraphError::CycleDetected(_)));
    assert_eq!(graph.data(first), None);
}
