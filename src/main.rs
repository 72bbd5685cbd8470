use clap::{Arg, Command};
use pbr::ProgressBar;
use spectral_rt::observer::*;
use spectral_rt::pipeline::*;
use spectral_rt::ray::RayCreateInfo;
use spectral_rt::rng::*;
use spectral_rt::scene::demo_scene;
use spectral_rt::threadpool::*;
use spectral_rt::types::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{thread, time};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let arg_matches = Command::new("srt")
        .version("0.1.0")
        .author("Jean-Francois Roy <jf@devklog.net>")
        .about("Spectral ray tracing along sight lines")
        .arg(
            Arg::new("lines")
                .long("lines")
                .short('l')
                .takes_value(true)
                .default_value("9")
                .help("number of sight lines"),
        )
        .arg(
            Arg::new("samples")
                .long("samples")
                .short('s')
                .takes_value(true)
                .default_value("100")
                .help("samples per sight line and slice"),
        )
        .arg(
            Arg::new("bins")
                .long("bins")
                .short('b')
                .takes_value(true)
                .default_value("40")
                .help("spectral bins"),
        )
        .arg(
            Arg::new("slices")
                .long("slices")
                .short('p')
                .takes_value(true)
                .default_value("1")
                .help("spectral slices traced separately"),
        )
        .arg(
            Arg::new("pipeline")
                .long("pipeline")
                .short('o')
                .takes_value(true)
                .possible_values(["power", "spectral", "rgb"])
                .default_value("power")
                .help("measured quantity"),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .takes_value(true)
                .default_value("100")
                .help("maximum path depth"),
        )
        .arg(
            Arg::new("extinction")
                .long("extinction")
                .takes_value(true)
                .default_value("0.1")
                .help("Russian roulette extinction probability"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .short('e')
                .takes_value(true)
                .default_value("0")
                .help("rng seed"),
        )
        .arg(
            Arg::new("random")
                .long("random")
                .short('m')
                .help("use a random rng seed"),
        )
        .get_matches();

    let lines: usize = match parse_arg(arg_matches.value_of("lines")) {
        Some(v) => v,
        None => {
            eprintln!("invalid sight line count");
            return Ok(());
        }
    };
    let samples: usize = match parse_arg(arg_matches.value_of("samples")) {
        Some(v) => v,
        None => {
            eprintln!("invalid sample count");
            return Ok(());
        }
    };
    let (bins, slices, max_depth, extinction_prob) = match (
        parse_arg(arg_matches.value_of("bins")),
        parse_arg(arg_matches.value_of("slices")),
        parse_arg(arg_matches.value_of("max-depth")),
        parse_arg(arg_matches.value_of("extinction")),
    ) {
        (Some(b), Some(s), Some(d), Some(e)) => (b, s, d, e),
        _ => {
            eprintln!("invalid ray parameters");
            return Ok(());
        }
    };
    let rng: RtRng = if arg_matches.is_present("random") {
        RtRng::from_entropy()
    } else {
        match parse_arg(arg_matches.value_of("seed")) {
            Some(v) => RtRng::seed_from_u64(v),
            None => {
                eprintln!("invalid rng seed");
                return Ok(());
            }
        }
    };

    let info = ObserverCreateInfo {
        ray: RayCreateInfo {
            bins,
            max_depth,
            min_depth: RayCreateInfo::default().min_depth.min(max_depth),
            extinction_prob,
            ..Default::default()
        },
        spectral_rays: slices,
        pixel_samples: samples,
        ray_samples: 1,
    };
    let observer = Observer::new(fan(lines)?, info)?;
    let scene = demo_scene();
    let pool = init_pool_with_rng(rng)?;

    tracing::info!(lines, samples, bins, slices, "observing demo scene");

    let done = Arc::new(AtomicBool::new(false));
    let ui_done = Arc::clone(&done);
    let ui_progress = observer.progress();
    let total = observer.work_units();
    let ui_thread = thread::Builder::new()
        .name("ui".to_string())
        .spawn(move || {
            let mut pb = ProgressBar::new(total as u64);
            loop {
                let x = ui_progress.load(Ordering::Relaxed);
                pb.set(x as u64);
                if x >= total || ui_done.load(Ordering::Relaxed) {
                    break;
                }
                thread::sleep(time::Duration::from_millis(200));
            }
            pb.finish();
        })?;

    let result = run(&observer, &scene, &pool, arg_matches.value_of("pipeline"));
    done.store(true, Ordering::Relaxed);
    if ui_thread.join().is_err() {
        tracing::warn!("progress thread panicked");
    }
    result
}

fn run(
    observer: &Observer<SightLines>,
    scene: &spectral_rt::scene::Scene,
    pool: &rayon::ThreadPool,
    pipeline: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    match pipeline {
        Some("spectral") => {
            let frame = observer.observe(scene, &mut SpectralPowerPipeline::new(SpectralPowerPolicy), pool)?;
            let config = observer.pipeline_config()?;
            for (i, line) in observer.generator().lines().iter().enumerate() {
                let means = frame.means(Coordinate::Point(i))?;
                let peak = means
                    .iter()
                    .enumerate()
                    .fold((0, f64::MIN), |acc, (b, &m)| if m > acc.1 { (b, m) } else { acc });
                let lambda =
                    config.min_wavelength() + (peak.0 as f64 + 0.5) * config.delta_wavelength();
                tracing::info!(line = i, x = line.origin.x, peak_nm = lambda, radiance = peak.1, "spectral radiance");
            }
        }
        Some("rgb") => {
            let image = observer.observe(scene, &mut RgbPipeline::new(RgbPolicy::default()), pool)?;
            for (i, px) in image.pixels.iter().enumerate() {
                tracing::info!(
                    line = i,
                    r = px.srgb[0],
                    g = px.srgb[1],
                    b = px.srgb[2],
                    error = px.error,
                    "colour"
                );
            }
        }
        _ => {
            let frame = observer.observe(scene, &mut PowerPipeline::new(PowerPolicy), pool)?;
            for (i, line) in observer.generator().lines().iter().enumerate() {
                let bin = frame.get(Coordinate::Point(i))?[0];
                tracing::info!(line = i, x = line.origin.x, power = bin.mean(), error = bin.error(), "power");
            }
        }
    }
    Ok(())
}

/// Sight lines spread along x, looking down -z at the demo scene.
fn fan(n: usize) -> spectral_rt::Result<SightLines> {
    let step = if n > 1 { 8. / (n - 1) as f64 } else { 0. };
    SightLines::new(
        (0..n)
            .map(|i| SightLine {
                origin: Vec3d::new(-4. + step * i as f64, 0., 10.),
                direction: Vec3d::new(0., 0., -1.),
                sensitivity: 1.,
            })
            .collect(),
    )
}

fn parse_arg<T: std::str::FromStr>(s: Option<&str>) -> Option<T> {
    match s?.parse::<T>() {
        Ok(n) => Some(n),
        Err(_) => None,
    }
}
