//! Property tests for the synthetic engine.

use proptest::prelude::*;
use qrmock_catalog::DeviceCatalog;
use qrmock_engine::{ComputeEngine, ExecutionRequest, ProgramId, SyntheticEngine, decode_params};
use serde_json::json;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn ghz(width: u32) -> String {
    let mut src = format!("OPENQASM 2.0;\nqreg q[{width}];\ncreg c[{width}];\nh q[0];\n");
    for i in 1..width {
        src.push_str(&format!("cx q[0],q[{i}];\n"));
    }
    src.push_str("measure q -> c;\n");
    src
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sampler_counts_match_shots(width in 1u32..=5, shots in 1u32..2000, seed in any::<u64>()) {
        let params = json!({"pubs": [[ghz(width), null, shots]]});
        let request = ExecutionRequest {
            program: ProgramId::Sampler,
            device: DeviceCatalog::builtin().resolve("fake_quito").unwrap(),
            params: decode_params(ProgramId::Sampler, &params).unwrap(),
            options: json!({}),
        };
        let result = runtime()
            .block_on(SyntheticEngine::new().with_seed(seed).execute(request))
            .unwrap();

        let data = &result.results[0].data;
        prop_assert_eq!(data.total_shots(), u64::from(shots));
        let counts = data.counts.as_ref().unwrap();
        prop_assert!(counts.keys().all(|k| k.len() == width as usize));
        prop_assert!(counts.keys().all(|k| k.chars().all(|c| c == '0' || c == '1')));
    }

    #[test]
    fn estimator_terms_stay_bounded(coeff in -2.0f64..2.0, seed in any::<u64>()) {
        let params = json!({"pubs": [[ghz(3), [{"ZZZ": coeff}, "XIX"]]]});
        let request = ExecutionRequest {
            program: ProgramId::Estimator,
            device: DeviceCatalog::builtin().resolve("fake_jakarta").unwrap(),
            params: decode_params(ProgramId::Estimator, &params).unwrap(),
            options: json!({}),
        };
        let result = runtime()
            .block_on(SyntheticEngine::new().with_seed(seed).execute(request))
            .unwrap();

        let evs = result.results[0].data.expectation_values.clone().unwrap();
        prop_assert_eq!(evs.len(), 2);
        prop_assert!(evs[0].abs() <= coeff.abs() + 1e-12);
        prop_assert!(evs[1].abs() <= 1.0);
    }
}
