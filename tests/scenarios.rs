use archsynth::{
    enumerate::SearchTrace,
    feasibility::Annotations,
    Candidate, ComponentType, ConfigurationError, ConnectionCount, Infeasibility, IsoMethod,
    Problem, SynthesisError, SynthesisOptions, Synthesizer,
};
use rstest::{fixture, rstest};

fn run(problem: &Problem, options: SynthesisOptions) -> archsynth::Synthesis {
    Synthesizer::new(problem, options).unwrap().run().unwrap()
}

/// Two component types with two instances each and a single port.
#[fixture]
fn pairs() -> Problem {
    Problem::new()
        .port_type("a")
        .port_type("b")
        .component(ComponentType::new("x").port("a", 1).instances(2))
        .component(ComponentType::new("y").port("b", 1).instances(2))
        .compatible("a", "b")
}

#[fixture]
fn triangle() -> Problem {
    Problem::new()
        .port_type("p")
        .component(ComponentType::new("node").port("p", 2).instances(3))
        .compatible("p", "p")
}

#[fixture]
fn hub_leaf_spare() -> Problem {
    Problem::new()
        .port_type("p")
        .component(
            ComponentType::new("hub")
                .port("p", 2)
                .connections(ConnectionCount::Exact(2)),
        )
        .component(ComponentType::new("leaf").port("p", 2))
        .component(ComponentType::new("spare").port("p", 2).optional().loops(true))
        .compatible("p", "p")
}

#[rstest]
fn test_two_pairs_give_a_single_architecture(pairs: Problem) {
    let synthesis = run(&pairs, SynthesisOptions::default());
    assert_eq!(synthesis.stats.matchings, 2);
    assert_eq!(synthesis.graphs.len(), 1);
    let graph = &synthesis.graphs[0];
    assert_eq!(graph.labels, vec!["x", "x", "y", "y"]);
    assert!(graph.removed.is_empty());
    assert_eq!(graph.graph.n_edges(), 2);
    assert!((0..4).all(|c| graph.graph.simple_degree(c) == 1));
}

#[rstest]
fn test_disabled_deduplication_keeps_duplicates(pairs: Problem) {
    let options = SynthesisOptions {
        iso_method: IsoMethod::None,
        ..Default::default()
    };
    let synthesis = run(&pairs, options);
    assert_eq!(synthesis.graphs.len(), 2);
    assert_eq!(synthesis.stats.feasible, synthesis.stats.unique);
}

#[test]
fn test_odd_port_count_fails_before_search() {
    let problem = Problem::new()
        .port_type("p")
        .component(ComponentType::new("x").port("p", 1).instances(3))
        .compatible("p", "p");
    assert!(matches!(
        Synthesizer::new(&problem, SynthesisOptions::default()),
        Err(SynthesisError::Configuration(ConfigurationError::OddPortCount(3)))
    ));
}

#[rstest]
fn test_cap_below_matching_count_truncates(triangle: Problem) {
    let options = SynthesisOptions {
        max_candidates: 5,
        ..Default::default()
    };
    let synthesis = run(&triangle, options);
    assert_eq!(synthesis.stats.matchings, 5);
    assert!(synthesis.stats.truncated);

    let synthesis = run(&triangle, SynthesisOptions::default());
    assert_eq!(synthesis.stats.matchings, 8);
    assert!(!synthesis.stats.truncated);
}

#[rstest]
fn test_hub_with_a_single_neighbour_is_dropped(hub_leaf_spare: Problem) {
    for filter in [true, false] {
        let options = SynthesisOptions {
            filter,
            ..Default::default()
        };
        let synthesis = run(&hub_leaf_spare, options);
        assert!(synthesis.stats.infeasible[&Infeasibility::ConnectionCount] > 0);
        assert_eq!(synthesis.graphs.len(), 1);
        for feasible in &synthesis.graphs {
            assert_eq!(feasible.labels[0], "hub");
            assert_eq!(feasible.graph.simple_degree(0), 2);
        }
    }
}

#[test]
fn test_problem_from_json() {
    let json = r#"{
        "port_types": ["power", "load"],
        "components": [
            { "name": "supply", "ports": { "power": 2 } },
            { "name": "motor", "ports": { "load": 1 } },
            { "name": "lamp", "ports": { "load": 1 } }
        ],
        "compatible": [["power", "load"]]
    }"#;
    let problem = Problem::from_json(json).unwrap();
    let options: SynthesisOptions =
        serde_json::from_str(r#"{ "parallelism": 2, "verbosity": "verbose" }"#).unwrap();
    let synthesis = run(&problem, options);
    // Swapping the two supply ports gives the same architecture
    assert_eq!(synthesis.stats.matchings, 2);
    assert_eq!(synthesis.stats.candidates, 1);
    assert_eq!(synthesis.graphs.len(), 1);
    assert_eq!(synthesis.graphs[0].labels, vec!["supply", "motor", "lamp"]);
}

fn no_double_edges(candidate: &Candidate<'_>, annotations: &mut Annotations) -> bool {
    let graph = candidate.graph;
    let max_weight = (0..graph.n_components())
        .flat_map(|i| graph.neighbours(i).map(move |j| graph.weight(i, j)))
        .max()
        .unwrap_or(0);
    annotations.insert("max_weight".into(), max_weight.into());
    max_weight < 2
}

#[test]
fn test_predicate_filters_and_annotates() {
    let problem = Problem::new()
        .port_type("p")
        .component(ComponentType::new("node").port("p", 2).instances(2))
        .component(ComponentType::new("relay").port("p", 2).optional().loops(true))
        .compatible("p", "p");
    // Either a ring of all three, or a double edge between the nodes with
    // the relay switched off
    let all = run(&problem, SynthesisOptions::default());
    assert_eq!(all.graphs.len(), 2);
    let synthesis = Synthesizer::new(&problem, SynthesisOptions::default())
        .unwrap()
        .with_predicate(no_double_edges)
        .run()
        .unwrap();
    assert_eq!(synthesis.graphs.len(), 1);
    assert_eq!(synthesis.graphs[0].annotations["max_weight"], 1);
    assert_eq!(synthesis.graphs[0].labels, vec!["node", "node", "relay"]);
    assert_eq!(synthesis.stats.infeasible[&Infeasibility::Rejected], 1);
}

#[rstest]
fn test_traced_run_reports_progress(triangle: Problem) {
    let synthesizer = Synthesizer::new(&triangle, SynthesisOptions::default()).unwrap();
    let mut reports = Vec::new();
    let synthesis = {
        let mut trace = SearchTrace::new().with_progress(|fraction| reports.push(fraction));
        synthesizer.run_traced(Some(&mut trace)).unwrap()
    };
    assert_eq!(synthesis.graphs.len(), 1);
    assert_eq!(reports.last().copied(), Some(1.0));
}

#[cfg(feature = "vf2")]
#[rstest]
#[case(0)]
#[case(3)]
fn test_oracles_find_the_same_architectures(#[case] parallelism: usize) {
    let problem = Problem::new()
        .port_type("p")
        .component(ComponentType::new("node").port("p", 3).instances(2))
        .component(ComponentType::new("hub").port("p", 4))
        .component(ComponentType::new("spare").port("p", 2).optional().loops(true))
        .compatible("p", "p");
    let with = |iso_method| SynthesisOptions {
        iso_method,
        parallelism,
        ..Default::default()
    };
    let refined = run(&problem, with(IsoMethod::Refinement));
    let vf2 = run(&problem, with(IsoMethod::Vf2));
    assert!(!refined.graphs.is_empty());
    assert_eq!(
        refined.graphs.iter().map(|g| g.index).collect::<Vec<_>>(),
        vf2.graphs.iter().map(|g| g.index).collect::<Vec<_>>()
    );
}
