//! svk_demo: end-to-end run of the switchable-key aggregation
//!
//! 1. Prove `MiMC(preimage) = h` and the dummy circuit (`a = 1`) on BLS12-377.
//! 2. Check the two verifying keys are shape-equivalent and build the
//!    switchable key `[dummy, main]`.
//! 3. Slot 0 carries the MiMC proof, slot 1 the dummy proof. Check the outer
//!    BW6-761 circuit is satisfied under `--selector` (default 1: slot 0 picks
//!    `main`, slot 1 picks `dummy`).
//! 4. With `--full-prove`, run outer setup and proving and verify natively.
//!
//! Flags:
//!   --preimage <u64>    default 42
//!   --selector <u64>    default 1
//!   --config <path>     JSON `PipelineConfig`; `SVK_SEED` overrides it
//!   --out-dir <dir>     write keys and proofs as artifact files
//!   --full-prove        also produce the outer proof (slow)

#![forbid(unsafe_code)]

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::Context;
use ark_serialize::CanonicalSerialize;
use svk::{
    check_satisfied, check_shape_equivalent,
    circuits::{DummyCircuit, PreimageCircuit},
    io::{key_digest, write_artifact, ArtifactKind},
    prove_outer, AggregationCircuit, Bls12Bw6, InnerE, InnerFr, PipelineConfig, ProofPipeline,
    Selector, SlotAssignment, SwitchableVerifyingKey,
};
use tracing::{info, warn};

type Outer = AggregationCircuit<Bls12Bw6, 2, 2>;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn parse_u64_flag(args: &[String], key: &str, default: u64) -> anyhow::Result<u64> {
    match parse_flag(args, key) {
        Some(s) => s.parse().map_err(|_| anyhow::anyhow!("{key} must be a u64 (got `{s}`)")),
        None => Ok(default),
    }
}

fn load_config(args: &[String]) -> anyhow::Result<PipelineConfig> {
    match parse_flag(args, "--config") {
        Some(p) => PipelineConfig::from_json_file(Path::new(&p))?.with_env(),
        None => PipelineConfig::from_env(),
    }
}

fn write<T: CanonicalSerialize>(dir: &Path, name: &str, kind: ArtifactKind, value: &T) -> anyhow::Result<()> {
    let path = dir.join(name);
    write_artifact(&path, kind, value).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "artifact written");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "svk=info,svk_demo=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    let preimage = parse_u64_flag(&args, "--preimage", 42)?;
    let selector_value = parse_u64_flag(&args, "--selector", 1)?;
    let out_dir = parse_flag(&args, "--out-dir").map(PathBuf::from);
    let full_prove = has_flag(&args, "--full-prove");
    let config = load_config(&args)?;
    info!(preimage, selector = selector_value, seed = ?config.seed, full_prove, "svk demo");

    // --- Inner proofs ---
    let pipeline = ProofPipeline::new(config.clone());
    let t = Instant::now();
    let main = pipeline
        .run::<InnerE, _>(PreimageCircuit::placeholder(), PreimageCircuit::new(InnerFr::from(preimage)))
        .context("main circuit")?;
    let dummy = pipeline
        .run::<InnerE, _>(DummyCircuit::placeholder(), DummyCircuit::new(InnerFr::from(1u64)))
        .context("dummy circuit")?;
    info!(ms = t.elapsed().as_millis() as u64, "inner proofs ready");

    // --- Switchable key ---
    check_shape_equivalent(&main.vk, &dummy.vk).context("main and dummy keys")?;
    let keys = Arc::new(SwitchableVerifyingKey::new([dummy.vk.clone(), main.vk.clone()])?);
    info!(
        dummy = %hex::encode(key_digest(&dummy.vk)?),
        main = %hex::encode(key_digest(&main.vk)?),
        "candidates [dummy, main]"
    );

    // --- Outer circuit ---
    let selector = Selector::new(selector_value, 2 * keys.flag_bits())?;
    let placeholder = Outer::placeholder(keys.clone(), [&main.compiled, &dummy.compiled])?;
    let assignment = Outer::assignment(
        keys.clone(),
        selector,
        [SlotAssignment::from(&main), SlotAssignment::from(&dummy)],
    )?;

    let t = Instant::now();
    match check_satisfied(placeholder.clone(), assignment.clone()) {
        Ok(compiled) => info!(
            constraints = compiled.num_constraints,
            ms = t.elapsed().as_millis() as u64,
            "outer circuit satisfied"
        ),
        Err(e) => {
            warn!(error = %e, "outer circuit rejected the selector");
            return Err(e).context(format!("selector {selector_value}"));
        }
    }

    if let Some(dir) = &out_dir {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        write(dir, "main.vk", ArtifactKind::VerifyingKey, &main.vk)?;
        write(dir, "main.proof", ArtifactKind::Proof, &main.proof)?;
        write(dir, "main.inputs", ArtifactKind::PublicInputs, &main.public_witness)?;
        write(dir, "dummy.vk", ArtifactKind::VerifyingKey, &dummy.vk)?;
        write(dir, "dummy.proof", ArtifactKind::Proof, &dummy.proof)?;
        write(dir, "dummy.inputs", ArtifactKind::PublicInputs, &dummy.public_witness)?;
    }

    if !full_prove {
        return Ok(());
    }

    let t = Instant::now();
    let mut rng = config.rng();
    let outer = prove_outer(placeholder, assignment, &mut rng).context("outer proof")?;
    info!(ms = t.elapsed().as_millis() as u64, "outer proof verified natively");

    if let Some(dir) = &out_dir {
        write(dir, "outer.vk", ArtifactKind::VerifyingKey, &outer.vk)?;
        write(dir, "outer.proof", ArtifactKind::Proof, &outer.proof)?;
    }
    Ok(())
}
