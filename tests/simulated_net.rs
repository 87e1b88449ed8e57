// tests/simulated_net.rs

use chaindag::build_net;
use chaindag::config::{NetFile, load_from_str};
use chaindag::dag::ChainGraph;
use chaindag::exec::EventStatus;
use chaindag::types::{DeviceType, NetType};
use chaindag_test_utils::builders::{ChainConfigBuilder, NetFileBuilder};
use chaindag_test_utils::{blocking_with_timeout, init_tracing};

fn parse(contents: &str) -> NetFile {
    NetFile::try_from(load_from_str(contents).unwrap()).unwrap()
}

const MIXED: &str = r#"
[net]
name = "mixed"
type = "async_scheduling"
num_workers = 2

[executor]
streams_per_gpu = 2
check_stream_status = true

[chain.load]
ops = [ { type = "Load", device = "cpu", millis = 2 } ]

[chain.conv]
after = ["load"]
ops = [
  { type = "Conv", device = "cuda", device_id = 0, millis = 5 },
  { type = "Relu", device = "cuda", device_id = 0, millis = 1 },
]

[chain.pool]
after = ["conv"]
ops = [ { type = "Pool", device = "cuda", device_id = 0, millis = 1, async_scheduling = true } ]

[chain.save]
after = ["pool"]
ops = [ { type = "Save", device = "cpu" } ]
"#;

#[tokio::test(flavor = "multi_thread")]
async fn mixed_cpu_gpu_net_runs_repeatedly() {
    init_tracing();

    blocking_with_timeout(|| {
        let cfg = parse(MIXED);
        let net = build_net(&cfg).unwrap();
        assert_eq!(net.num_chains(), 4);

        for _ in 0..3 {
            assert!(net.run().unwrap());
            assert!(net
                .status_snapshot()
                .iter()
                .all(|s| *s == EventStatus::Success));
        }
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_gpu_op_skips_downstream_chains() {
    init_tracing();

    blocking_with_timeout(|| {
        let cfg = parse(&MIXED.replace(
            r#"{ type = "Relu", device = "cuda", device_id = 0, millis = 1 }"#,
            r#"{ type = "Relu", device = "cuda", device_id = 0, fail = true }"#,
        ));
        let net = build_net(&cfg).unwrap();
        let names: Vec<&String> = cfg.chain.keys().collect();
        let id = |name: &str| names.iter().position(|n| n.as_str() == name).unwrap();

        assert!(!net.run().unwrap());
        assert_eq!(
            net.chain_error(id("conv")).as_deref(),
            Some("failed to execute operator: Relu")
        );
        assert!(net.was_skipped(id("pool")));
        assert!(net.was_skipped(id("save")));
        assert!(!net.was_skipped(id("load")));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn faulting_op_surfaces_through_handle_run_error() {
    init_tracing();

    blocking_with_timeout(|| {
        let cfg = parse(
            r#"
[chain.a]
ops = [ { type = "Alloc", fault = "out of memory" } ]

[chain.b]
after = ["a"]
ops = [ { type = "Use" } ]
"#,
        );
        let net = build_net(&cfg).unwrap();

        assert!(!net.run().unwrap());
        let err = net.handle_run_error().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("out of memory"), "{text}");
        assert!(text.contains("Alloc"), "{text}");
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn dag_net_type_runs_on_a_single_blocking_pool() {
    init_tracing();

    blocking_with_timeout(|| {
        let cfg = NetFileBuilder::new()
            .net_type(NetType::Dag)
            .with_chain("a", ChainConfigBuilder::new().cpu_op("A").build())
            .with_chain(
                "b",
                ChainConfigBuilder::new()
                    .after("a")
                    .op("B", DeviceType::Mkldnn)
                    .build(),
            )
            .with_chain("c", ChainConfigBuilder::new().after("a").cpu_op("C").build())
            .build();

        let net = build_net(&cfg).unwrap();
        assert!(net.flags().is_blocking);
        assert!(net.run().unwrap());
        assert_eq!(net.registry().len(), 1);
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn inference_mode_collapses_to_one_chain() {
    blocking_with_timeout(|| {
        let cfg = parse(
            r#"
[executor]
inference_mode = true

[chain.first]
ops = [ { type = "A" }, { type = "B" } ]

[chain.second]
after = ["first"]
ops = [ { type = "C" } ]
"#,
        );
        let graph = ChainGraph::from_config(&cfg).unwrap();
        assert_eq!(graph.len(), 2);

        let net = build_net(&cfg).unwrap();
        assert_eq!(net.num_chains(), 1);
        assert_eq!(net.graph().chain(0), &[0, 1, 2]);
        assert!(net.run().unwrap());
    })
    .await;
}

#[test]
fn failing_builder_chain_is_valid_config() {
    let cfg = NetFileBuilder::new()
        .with_chain("x", ChainConfigBuilder::new().cpu_op("X").failing().build())
        .build();
    assert!(cfg.chain["x"].ops[0].fail);
}

#[tokio::test(flavor = "multi_thread")]
async fn cli_entry_point_runs_and_reports_failures() {
    use std::io::Write;
    use chaindag::cli::CliArgs;

    init_tracing();

    let mut ok = tempfile::NamedTempFile::new().unwrap();
    write!(ok, "{MIXED}").unwrap();
    let args = |path: &std::path::Path, dry_run: bool| CliArgs {
        net: path.to_path_buf(),
        iterations: 2,
        log_level: None,
        dry_run,
    };

    chaindag_test_utils::with_timeout(chaindag::run(args(ok.path(), true)))
        .await
        .unwrap();
    chaindag_test_utils::with_timeout(chaindag::run(args(ok.path(), false)))
        .await
        .unwrap();

    let mut failing = tempfile::NamedTempFile::new().unwrap();
    write!(
        failing,
        r#"
[chain.a]
ops = [ {{ type = "Broken", fail = true }} ]
"#
    )
    .unwrap();
    let err = chaindag_test_utils::with_timeout(chaindag::run(args(failing.path(), false)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("2 of 2 runs failed"), "{err}");
}
