use neurite_core::{
    GrowthError, ModelConfig, ModelKind, Neuron, Population, PopulationConfig,
    config::{AdConfig, AdcmConfig, BesConfig, GrowthConfig, TransportConfig},
    tree::NodeKind,
    types::ROOT,
};

fn reference_bes() -> ModelConfig {
    ModelConfig::Bes(BesConfig {
        growth: GrowthConfig {
            rate_cv: 0.0,
            ..BesConfig::default().growth
        },
        ..BesConfig::default()
    })
}

fn slow_adcm() -> ModelConfig {
    ModelConfig::Adcm(AdcmConfig {
        transport: TransportConfig {
            kbr: 0.1,
            diffusion: 0.2,
            transport: 1.0,
            production: 2.0,
            soma_uptake: 1.0,
            terminal_uptake: 1.0,
        },
        ..AdcmConfig::default()
    })
}

#[test]
fn bes_reference_parameters_usually_branch() {
    let branched = (0..20)
        .filter(|&seed| {
            let mut n = Neuron::new(&reference_bes(), seed).unwrap();
            n.run_until(264.0, 1.0).unwrap();
            n.stats().max_order >= 1
        })
        .count();
    assert!(branched >= 15, "only {branched} of 20 trees branched");
}

#[test]
fn bes_stops_branching_after_the_branching_phase() {
    let mut n = Neuron::new(&reference_bes(), 7).unwrap();
    n.run_until(264.0, 1.0).unwrap();
    let at_stop = n.stats();
    n.run_until(400.0, 1.0).unwrap();
    let later = n.stats();
    assert_eq!(later.terminals, at_stop.terminals);
    assert_eq!(later.segments, at_stop.segments);
    assert!(later.total_length > at_stop.total_length);
}

#[test]
fn bes_is_reproducible_from_its_seed() {
    let grow = || {
        let mut n = Neuron::new(&reference_bes(), 42).unwrap();
        n.run_until(264.0, 1.0).unwrap();
        n
    };
    let (mut a, mut b) = (grow(), grow());
    assert_eq!(a.stats(), b.stats());
    assert_eq!(a.tree().to_string(), b.tree().to_string());
    let lengths = |n: &Neuron| -> Vec<f32> { n.tree().iter().map(|(_, x)| x.length).collect() };
    assert_eq!(lengths(&a), lengths(&b));
}

#[test]
fn ad_without_chemistry_stays_at_zero() {
    let cfg = ModelConfig::Ad(AdConfig {
        transport: TransportConfig {
            diffusion: 0.0,
            transport: 0.0,
            production: 0.0,
            soma_uptake: 0.0,
            terminal_uptake: 0.0,
            ..TransportConfig::default()
        },
        ..AdConfig::default()
    });
    let mut n = Neuron::new(&cfg, 3).unwrap();
    for _ in 0..100 {
        n.step(1.0).unwrap();
        for (_, node) in n.tree().iter() {
            assert_eq!(node.conc, 0.0);
            assert_eq!(node.conc_prev, 0.0);
        }
    }
    // Nothing to branch on.
    assert_eq!(n.stats().terminals, 1);
}

#[test]
fn adcm_compartments_stay_between_one_and_two_lengths() {
    let cfg = slow_adcm();
    let dl = match cfg {
        ModelConfig::Adcm(c) => c.compartment_length,
        _ => unreachable!(),
    };
    for seed in 0..4 {
        let mut n = Neuron::new(&cfg, seed).unwrap();
        n.run_until(30.0, 0.1).unwrap();
        for (id, node) in n.tree().iter() {
            match node.kind {
                NodeKind::Compartment => assert!(
                    node.length >= dl - 1e-4 && node.length < 2.0 * dl,
                    "compartment {} has length {}",
                    node.key,
                    node.length
                ),
                NodeKind::GrowthCone => assert!(node.is_terminal()),
                NodeKind::Soma => assert_eq!(id, ROOT),
                NodeKind::Segment => panic!("segment node in a compartmental tree"),
            }
            if node.is_terminal() && id != ROOT {
                assert_eq!(node.kind, NodeKind::GrowthCone);
            }
        }
    }
}

#[test]
fn pooled_arrays_account_for_every_segment() {
    let config = PopulationConfig {
        trees: 6,
        t_stop: 150.0,
        seed: 21,
        ..PopulationConfig::default()
    };
    let mut population = Population::new(reference_bes(), config).unwrap();
    let stats = population.run().unwrap();

    let terminals: u32 = stats.trees.iter().map(|t| t.terminals).sum();
    let intermediates: u32 = stats.trees.iter().map(|t| t.intermediates()).sum();
    assert_eq!(stats.orders.len(), terminals as usize);
    assert_eq!(stats.path_lengths.len(), terminals as usize);
    assert_eq!(stats.terminal_lengths.len(), terminals as usize);
    assert_eq!(stats.intermediate_lengths.len(), intermediates as usize);

    let pooled: f32 = stats.terminal_lengths.iter().sum::<f32>()
        + stats.intermediate_lengths.iter().sum::<f32>();
    let total: f32 = stats.trees.iter().map(|t| t.total_length).sum();
    assert!((pooled - total).abs() <= 1e-3 * total.max(1.0));
    let max_order = stats.trees.iter().map(|t| t.max_order).max().unwrap();
    assert!(stats.orders.iter().all(|&o| o <= max_order));
}

#[test]
fn json_configuration_drives_a_population() {
    let model: ModelConfig = serde_json::from_str(
        r#"{
            "model": "adcm",
            "compartment_length": 2.0,
            "transport": {
                "kbr": 0.05,
                "transport": 1.0,
                "terminal_uptake": 1.0,
                "soma_uptake": 1.0
            }
        }"#,
    )
    .unwrap();
    assert_eq!(model.kind(), ModelKind::Adcm);
    let ModelConfig::Adcm(adcm) = model else {
        unreachable!()
    };
    assert_eq!(adcm.compartment_length, 2.0);
    assert_eq!(adcm.transport.production, TransportConfig::default().production);
    assert_eq!(adcm.growth, GrowthConfig::default());

    let config: PopulationConfig =
        serde_json::from_str(r#"{ "trees": 3, "dt": 0.1, "t_stop": 5.0, "seed": 9 }"#).unwrap();
    let mut population = Population::new(model, config).unwrap();
    let stats = population.run().unwrap();
    assert_eq!(stats.trees.len(), 3);
    assert!((population.time() - 5.0).abs() < 1e-6);
}

#[test]
fn unknown_model_names_are_rejected() {
    let err = "neuron".parse::<ModelKind>().unwrap_err();
    assert!(matches!(err, GrowthError::UnknownModel(name) if name == "neuron"));
    assert_eq!("ADcm".parse::<ModelKind>().unwrap(), ModelKind::Adcm);
    assert!(serde_json::from_str::<ModelConfig>(r#"{ "model": "neuron" }"#).is_err());
}
