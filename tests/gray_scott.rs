use grayscott::{Backend, BackendKind, OutputFormat, Parameters, SimError, create};

fn scenario() -> Parameters {
    Parameters {
        du: 0.16,
        dv: 0.08,
        f: 0.035,
        k: 0.065,
        dt: 1.0,
        nx: 32,
        ny: 32,
        seed: Some(42),
        nsteps: Some(10),
        ..Parameters::default()
    }
}

fn run(kind: &str, params: &Parameters) -> Box<dyn Backend> {
    let mut sim = create(kind).unwrap();
    sim.initialize(params).unwrap();
    sim.run().unwrap();
    sim
}

fn bits(sim: &dyn Backend) -> Vec<u32> {
    let (u, v) = sim.fields().unwrap();
    u.as_slice()
        .iter()
        .chain(v.as_slice())
        .map(|x| x.to_bits())
        .collect()
}

#[test]
fn seeded_scenario_is_bit_identical() {
    for kind in ["reference", "vectorized"] {
        let a = run(kind, &scenario());
        let b = run(kind, &scenario());
        assert_eq!(a.steps_taken(), 10);
        assert_eq!(bits(a.as_ref()), bits(b.as_ref()), "{kind} is not deterministic");
    }
}

#[test]
fn reinitialize_restarts_the_sequence() {
    let mut sim = run("vectorized", &scenario());
    let first = bits(sim.as_ref());
    sim.initialize(&scenario()).unwrap();
    sim.run().unwrap();
    assert_eq!(bits(sim.as_ref()), first);
}

#[test]
fn different_seeds_diverge() {
    let a = run("reference", &scenario());
    let b = run("reference", &Parameters { seed: Some(43), ..scenario() });
    assert_ne!(bits(a.as_ref()), bits(b.as_ref()));
}

#[test]
fn backends_agree_within_tolerance() {
    let params = Parameters {
        nx: 67,
        ny: 45,
        nsteps: Some(50),
        ..scenario()
    };
    let reference = run("reference", &params);
    let vectorized = run("vectorized", &params);
    let (ur, vr) = reference.fields().unwrap();
    let (uv, vv) = vectorized.fields().unwrap();
    assert!(ur.almost_equal(uv, 1e-6, 1e-5));
    assert!(vr.almost_equal(vv, 1e-6, 1e-5));
}

#[test]
fn zero_noise_initial_state() {
    for kind in ["naive", "avx256"] {
        let mut sim = create(kind).unwrap();
        sim.initialize(&Parameters { initial_noise: 0.0, ..scenario() }).unwrap();
        let (u, v) = sim.fields().unwrap();
        assert!(u.as_slice().iter().all(|&x| x == 1.0));
        assert!(v.as_slice().iter().all(|&x| x == 0.0));
    }
}

#[test]
fn unseeded_initialization_still_works() {
    let mut sim = create("reference").unwrap();
    sim.initialize(&Parameters { seed: None, ..scenario() }).unwrap();
    sim.advance_frame().unwrap();
    assert_eq!(sim.steps_taken(), 10);
}

#[test]
fn factory_discriminators() {
    assert!(create("bogus").is_none());
    assert!(create("gpu").is_none());
    assert!(BackendKind::Accelerated.build().is_none());
    assert_eq!(create("simd").unwrap().name(), "vectorized");
    assert_eq!(create("reference").unwrap().name(), "reference");
}

#[test]
fn gray_output_tracks_v() {
    let sim = run("vectorized", &scenario());
    let mut image = vec![0u8; 32 * 32];
    assert_eq!(sim.copy_to_output(&mut image, OutputFormat::Gray8), Ok(32 * 32));

    let (_, v) = sim.fields().unwrap();
    for (px, &x) in image.iter().zip(v.as_slice()) {
        let expected = (x.clamp(0.0, 1.0) * 255.0).round();
        assert_eq!(f32::from(*px), expected);
    }

    let mut short = vec![0u8; 32 * 32 - 1];
    assert!(matches!(
        sim.copy_to_output(&mut short, OutputFormat::Gray8),
        Err(SimError::OutputTooSmall { .. })
    ));
}
