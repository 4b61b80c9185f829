use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rust_qmc_kernels::{
    read_run_config, AtomicOrbitals, DerivativeOrder, ElectronBatch, JastrowFactor, JastrowTensor,
    OrbitalTensor,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Walkers per batch; overrides the config file.
    #[arg(short, long)]
    nwalkers: Option<usize>,

    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = read_run_config(&args.config)
        .with_context(|| format!("reading run configuration from {}", args.config))?;
    let nelec = config.nelec();
    let nwalkers = args.nwalkers.or(config.nwalkers).unwrap_or(10);

    let orbitals = AtomicOrbitals::new(&config.basis, nelec, config.engine)?;
    let jastrow = JastrowFactor::new(&config.jastrow, config.engine)?;
    info!("{orbitals}");
    info!("{jastrow}");

    let mut rng = StdRng::seed_from_u64(args.seed);
    let batch = ElectronBatch::random(nwalkers, nelec, &mut rng);

    let OrbitalTensor::All { value, gradient, laplacian } =
        orbitals.evaluate(&batch, DerivativeOrder::All)?
    else {
        anyhow::bail!("orbital evaluation did not return the full tensor set");
    };
    let JastrowTensor::All { value: jast, gradient: jast_grad, laplacian: jast_lap } =
        jastrow.evaluate(&batch, DerivativeOrder::All)?
    else {
        anyhow::bail!("Jastrow evaluation did not return the full tensor set");
    };
    let jast_lap = jast_lap.sum_axis(Axis(1));

    println!("Orbital and Jastrow evaluation");
    println!("------------------------------");
    println!("Walkers: {nwalkers}, electrons: {nelec}, orbitals: {}", orbitals.norb());
    println!("AO values    {:?}", value.dim());
    println!("AO gradient  {:?}", gradient.dim());
    println!("AO laplacian {:?}", laplacian.dim());
    println!(
        "Mean |AO| over the batch: {:.6}",
        value.mapv(f64::abs).mean().unwrap_or(0.0)
    );
    println!("J gradient   {:?}", jast_grad.dim());
    for (iw, (j, lap)) in jast.index_axis(Axis(1), 0).iter().zip(&jast_lap).enumerate() {
        println!("walker {iw:>3}: J = {j:.6}, sum_i lap_i J = {lap:.6}");
    }
    Ok(())
}
