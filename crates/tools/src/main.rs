use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use annotator::{AnnotatorBuilder, AnnotatorOptions, MapAnnotator, Payload};
use formats::{FeatureCollection, NoDescriptions, PopoverFeed, marker_collection_value, normalize};
use foundation::LatLng;
use layers::{HeadlessView, MapView};
use navigation::Completion;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "tour" => cmd_tour(args),
        "markers" => cmd_markers(args),
        "countries" => cmd_countries(args),
        _ => Err(usage()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TourStep {
    step: usize,
    index: usize,
    name: Option<String>,
    country: Option<String>,
    center: Option<[f64; 2]>,
    zoom: f64,
    popup_open: bool,
}

fn cmd_tour(args: Vec<String>) -> Result<(), String> {
    // annotate tour <countries.geojson> <feed.json> [--cluster] [--steps N] [--options FILE] [--goal CODE]
    if args.len() < 2 {
        return Err(usage());
    }

    let countries_path = PathBuf::from(&args[0]);
    let feed_path = PathBuf::from(&args[1]);
    let mut cluster = false;
    let mut steps: Option<usize> = None;
    let mut options_path: Option<PathBuf> = None;
    let mut goals: Vec<String> = Vec::new();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--cluster" => cluster = true,
            "--steps" => {
                i += 1;
                let v = args.get(i).ok_or("--steps requires a value")?;
                steps = Some(v.parse().map_err(|e| format!("--steps {v}: {e}"))?);
            }
            "--options" => {
                i += 1;
                let v = args.get(i).ok_or("--options requires a value")?;
                options_path = Some(PathBuf::from(v));
            }
            "--goal" => {
                i += 1;
                let v = args.get(i).ok_or("--goal requires a value")?;
                goals.push(v.clone());
            }
            other => return Err(format!("unknown arg: {other}\n\n{}", usage())),
        }
        i += 1;
    }

    let options = match &options_path {
        Some(p) => {
            let text = read(p)?;
            AnnotatorOptions::from_json_str(&text).map_err(|e| format!("{p:?}: {e}"))?
        }
        None => AnnotatorOptions::default(),
    };
    let countries = FeatureCollection::from_geojson_str(&read(&countries_path)?)
        .map_err(|e| format!("{countries_path:?}: {e}"))?;
    let feed = PopoverFeed::from_json_str(&read(&feed_path)?)
        .map_err(|e| format!("{feed_path:?}: {e}"))?;

    let mut builder = AnnotatorBuilder::new().options(options);
    if cluster {
        builder = builder.enable_clustering().map_err(|e| e.to_string())?;
    }
    let view = HeadlessView::new(1024.0, 768.0).with_view(LatLng::new(0.0, 0.0), 2.0);
    let mut map = builder.build(view).map_err(|e| e.to_string())?;

    // Countries first so that markers naming a country highlight it.
    map.add_country_data(countries);
    map.add_markers(&feed.into_markers())
        .map_err(|e| e.to_string())?;
    for code in &goals {
        if !map.set_goal(code) {
            return Err(format!("--goal {code}: no such country"));
        }
    }

    map.on("zoomnext", |p| {
        if let Payload::Marker(f) = p {
            tracing::info!(
                index = f.properties.index,
                name = f.properties.description.as_deref().unwrap_or("-"),
                "zoomnext"
            );
        }
    });

    let total = steps.unwrap_or(map.markers().len());
    let mut report = Vec::with_capacity(total);
    for step in 0..total {
        let completion = Completion::new(move |_| tracing::debug!(step, "camera settled"));
        let index = map.zoom_next(Some(completion)).map_err(|e| e.to_string())?;
        map.view_mut().finish_animations();
        map.tick();
        report.push(tour_step(&map, step, index));
    }

    map.zoom_to_countries();
    tracing::info!(
        markers = map.markers().len(),
        countries = map.country_layer().layers().len(),
        highlighted = map.country_layer().highlighted().count(),
        "tour finished"
    );

    print_json(&report)
}

fn tour_step(map: &MapAnnotator<HeadlessView>, step: usize, index: usize) -> TourStep {
    let feature = map.find_by_index(index);
    let popup_open = map
        .marker_layer()
        .layer()
        .and_then(|l| l.open_popup_index())
        == Some(index);
    TourStep {
        step,
        index,
        name: feature.and_then(|f| f.properties.description.clone()),
        country: feature.and_then(|f| f.properties.country.clone()),
        center: map.view().center().map(|c| [c.lat, c.lng]),
        zoom: map.view().zoom(),
        popup_open,
    }
}

fn cmd_markers(args: Vec<String>) -> Result<(), String> {
    // annotate markers <feed.json>
    let [path] = args.as_slice() else {
        return Err(usage());
    };
    let feed = PopoverFeed::from_json_str(&read(&PathBuf::from(path))?)
        .map_err(|e| format!("{path}: {e}"))?;

    let mut features = Vec::new();
    for (index, input) in feed.into_markers().iter().enumerate() {
        let mut feature = normalize(input, &NoDescriptions).map_err(|e| format!("marker {index}: {e}"))?;
        feature.properties.index = index;
        features.push(feature);
    }
    tracing::info!(markers = features.len(), "markers normalized");
    print_json(&marker_collection_value(&features))
}

#[derive(Debug, Serialize)]
struct CountrySummary {
    code: Option<String>,
    geometry: &'static str,
    south_west: Option<[f64; 2]>,
    north_east: Option<[f64; 2]>,
}

fn cmd_countries(args: Vec<String>) -> Result<(), String> {
    // annotate countries <countries.geojson>
    let [path] = args.as_slice() else {
        return Err(usage());
    };
    let data = FeatureCollection::from_geojson_str(&read(&PathBuf::from(path))?)
        .map_err(|e| format!("{path}: {e}"))?;

    let summary: Vec<CountrySummary> = data
        .features
        .iter()
        .map(|f| {
            let bounds = f.geometry.bounds();
            CountrySummary {
                code: f.id.clone(),
                geometry: f.geometry.type_name(),
                south_west: bounds.map(|b| [b.south_west.lat, b.south_west.lng]),
                north_east: bounds.map(|b| [b.north_east.lat, b.north_east.lng]),
            }
        })
        .collect();
    print_json(&summary)
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn usage() -> String {
    let exe = env::args().next().unwrap_or_else(|| "annotate".to_string());
    format!(
        "Usage:\n  {exe} tour <countries.geojson> <feed.json> [--cluster] [--steps N] [--options FILE] [--goal CODE]...\n  {exe} markers <feed.json>\n  {exe} countries <countries.geojson>\n\nNotes:\n- The feed is a `{{\"popovers\": [...]}}` document; each entry becomes one marker.\n- `tour` drives a headless map through every marker and prints one JSON record per step.\n- Set RUST_LOG=debug to trace camera commands and layer syncs.\n"
    )
}
