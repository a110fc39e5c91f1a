//! equiscan CLI — split panoramas into faces and map detections back.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use equiscan::geo::{bearing_layout, render_survey, BearingView, GeoPoint};
use equiscan::{
    DetectionManifest, ExpansionPolicy, FaceLayout, Interpolation, LayoutPreset, Locator,
    LocatorConfig, Panorama, TreeExpansion,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "equiscan")]
#[command(about = "Split 360° equirectangular panoramas into faces and locate detections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[allow(clippy::large_enum_variant)]
enum Commands {
    /// Render the faces of a layout and write the layout JSON next to them.
    Faces(CliFacesArgs),

    /// Map a detections manifest back onto the panorama.
    Locate(CliLocateArgs),

    /// Render one view, or the survey views, at a compass bearing or explicit yaw.
    View(CliViewArgs),

    /// Print a layout preset as JSON.
    LayoutInfo {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Panorama width used to size faces when --size is omitted.
        #[arg(long, default_value = "4096")]
        panorama_width: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Cube,
    Ring,
    Grid,
    TreeSurvey,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InterpolationArg {
    Nearest,
    Bilinear,
}

impl InterpolationArg {
    fn to_core(self) -> Interpolation {
        match self {
            Self::Nearest => Interpolation::Nearest,
            Self::Bilinear => Interpolation::Bilinear,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct LayoutArgs {
    /// Face-set preset.
    #[arg(long, value_enum, default_value_t = PresetArg::Cube)]
    preset: PresetArg,

    /// Face edge length in pixels (default: panorama width / 4).
    #[arg(long)]
    size: Option<u32>,

    /// Field of view for ring and grid presets (degrees).
    #[arg(long, default_value = "90.0")]
    fov: f64,

    /// Number of faces for the ring preset.
    #[arg(long, default_value = "8")]
    ring_count: usize,

    /// Pitch of the ring preset (degrees).
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    ring_pitch: f64,

    /// Yaw values of the grid preset (degrees, comma separated).
    #[arg(long, value_delimiter = ',', default_value = "0,60,120,180,240,300")]
    grid_yaws: Vec<f64>,

    /// Pitch values of the grid preset (degrees, comma separated).
    #[arg(long, value_delimiter = ',', default_value = "-30,0,30", allow_hyphen_values = true)]
    grid_pitches: Vec<f64>,

    /// Elevation of the tree-survey ring (degrees).
    #[arg(long, default_value = "30.0")]
    elevation: f64,
}

impl LayoutArgs {
    fn to_preset(&self) -> LayoutPreset {
        match self.preset {
            PresetArg::Cube => LayoutPreset::Cube { size: self.size },
            PresetArg::Ring => LayoutPreset::Ring {
                count: self.ring_count,
                pitch_deg: self.ring_pitch,
                fov_deg: self.fov,
                size: self.size,
            },
            PresetArg::Grid => LayoutPreset::Grid {
                yaws_deg: self.grid_yaws.clone(),
                pitches_deg: self.grid_pitches.clone(),
                fov_deg: self.fov,
                size: self.size,
            },
            PresetArg::TreeSurvey => LayoutPreset::TreeSurvey {
                elevation_deg: self.elevation,
                size: self.size,
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliFacesArgs {
    /// Path to the equirectangular panorama.
    #[arg(long)]
    panorama: PathBuf,

    /// Directory for face images and layout.json.
    #[arg(long)]
    out_dir: PathBuf,

    /// Load the layout from JSON instead of a preset.
    #[arg(long)]
    layout: Option<PathBuf>,

    #[command(flatten)]
    preset: LayoutArgs,

    /// Resampling kernel.
    #[arg(long, value_enum, default_value_t = InterpolationArg::Bilinear)]
    interpolation: InterpolationArg,
}

#[derive(Debug, Clone, Args)]
struct CliLocateArgs {
    /// Path to the equirectangular panorama.
    #[arg(long)]
    panorama: PathBuf,

    /// Layout JSON the faces were rendered with.
    #[arg(long)]
    layout: PathBuf,

    /// Detections manifest (JSON).
    #[arg(long)]
    manifest: PathBuf,

    /// Locator config JSON; command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write the location report (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Path to write the annotated panorama.
    #[arg(long)]
    annotated: Option<PathBuf>,

    /// Directory to write one crop image per located object.
    #[arg(long)]
    crops_dir: Option<PathBuf>,

    /// Minimum detection score.
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Keep only these class ids (comma separated).
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<u32>>,

    /// Grow crops towards the trunk (tree-shaped expansion).
    #[arg(long)]
    tree_expansion: bool,

    /// Crop padding as a fraction of the object size.
    #[arg(long)]
    padding: Option<f64>,

    /// Marker radius in pixels.
    #[arg(long)]
    radius: Option<f64>,

    /// Skip bbox outlines in the annotated panorama.
    #[arg(long)]
    no_outlines: bool,
}

impl CliLocateArgs {
    fn to_config(&self) -> CliResult<LocatorConfig> {
        let mut cfg = match &self.config {
            Some(path) => LocatorConfig::from_json_file(path)?,
            None => LocatorConfig::default(),
        };
        if let Some(v) = self.min_confidence {
            cfg.filter.min_confidence = v;
        }
        if let Some(c) = &self.classes {
            cfg.filter.target_classes = Some(c.clone());
        }
        if self.tree_expansion {
            cfg.region.expansion = ExpansionPolicy::Tree(TreeExpansion::default());
        }
        if let Some(p) = self.padding {
            cfg.region.padding = p;
        }
        if let Some(r) = self.radius {
            cfg.marker.radius = r;
        }
        if self.no_outlines {
            cfg.draw_outlines = false;
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Args)]
struct CliViewArgs {
    /// Path to the equirectangular panorama.
    #[arg(long)]
    panorama: PathBuf,

    /// Output image path (output directory with --survey).
    #[arg(long)]
    out: PathBuf,

    /// Render the centered, zoom, elevated, base and wide views into --out.
    #[arg(long)]
    survey: bool,

    /// Look at this compass bearing (degrees).
    #[arg(long, conflicts_with = "yaw")]
    bearing: Option<f64>,

    /// Camera position and target position as `lat,lon`; sets the bearing.
    #[arg(long, value_delimiter = ',', num_args = 2, allow_hyphen_values = true)]
    camera: Option<Vec<f64>>,

    #[arg(long, value_delimiter = ',', num_args = 2, allow_hyphen_values = true)]
    target: Option<Vec<f64>>,

    /// Compass heading of the panorama center column (degrees).
    #[arg(long, default_value = "0.0")]
    heading: f64,

    /// Explicit panorama yaw instead of a bearing (degrees).
    #[arg(long, allow_hyphen_values = true)]
    yaw: Option<f64>,

    /// View pitch (degrees).
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pitch: f64,

    /// Horizontal field of view (degrees).
    #[arg(long, default_value = "90.0")]
    fov: f64,

    /// View width in pixels; the survey edge length with --survey.
    #[arg(long, default_value = "1024")]
    width: u32,

    #[arg(long, default_value = "1024")]
    height: u32,

    /// Resampling kernel.
    #[arg(long, value_enum, default_value_t = InterpolationArg::Bilinear)]
    interpolation: InterpolationArg,
}

impl CliViewArgs {
    /// Bearing and heading such that `bearing - heading` is the view yaw.
    fn bearing_and_heading(&self) -> CliResult<(f64, f64)> {
        if let Some(yaw) = self.yaw {
            return Ok((yaw, 0.0));
        }
        if let Some(b) = self.bearing {
            return Ok((b, self.heading));
        }
        match (&self.camera, &self.target) {
            (Some(c), Some(t)) => {
                let b = GeoPoint::new(c[0], c[1]).bearing_to(&GeoPoint::new(t[0], t[1]));
                tracing::info!("Bearing to target: {:.2} deg", b);
                Ok((b, self.heading))
            }
            _ => Err("view needs --yaw, --bearing, or both --camera and --target".into()),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Faces(args) => run_faces(&args),
        Commands::Locate(args) => run_locate(&args),
        Commands::View(args) => run_view(&args),
        Commands::LayoutInfo {
            layout,
            panorama_width,
        } => run_layout_info(&layout, panorama_width),
    }
}

fn load_panorama(path: &Path) -> CliResult<Panorama> {
    tracing::info!("Loading panorama: {}", path.display());
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    let pano = Panorama::from_dynamic(img)?;
    tracing::info!("Panorama size: {}x{}", pano.width(), pano.height());
    Ok(pano)
}

// ── faces ──────────────────────────────────────────────────────────────

fn run_faces(args: &CliFacesArgs) -> CliResult<()> {
    let pano = load_panorama(&args.panorama)?;
    let layout = match &args.layout {
        Some(path) => FaceLayout::from_json_file(path)?,
        None => args.preset.to_preset().build(pano.width())?,
    };

    std::fs::create_dir_all(&args.out_dir)?;
    let faces = equiscan::face::render_faces(&pano, &layout, args.interpolation.to_core());
    for f in &faces {
        let path = args.out_dir.join(format!("{}.png", f.name));
        f.image.save(&path)?;
        tracing::info!("Face {} '{}' written to {}", f.face_id, f.name, path.display());
    }

    let layout_path = args.out_dir.join("layout.json");
    layout.write_json_file(&layout_path)?;
    tracing::info!("Layout written to {}", layout_path.display());
    Ok(())
}

// ── locate ─────────────────────────────────────────────────────────────

fn run_locate(args: &CliLocateArgs) -> CliResult<()> {
    let pano = load_panorama(&args.panorama)?;
    let layout = FaceLayout::from_json_file(&args.layout)?;
    let manifest = DetectionManifest::from_json_file(&args.manifest)?;
    let locator = Locator::new(args.to_config()?);

    let report = locator.locate_manifest(&pano, &layout, &manifest)?;
    tracing::info!(
        "Located {} objects, skipped {}, {} failed faces",
        report.objects.len(),
        report.skipped.len(),
        report.failed_faces.len()
    );

    if let Some(path) = &args.annotated {
        locator.annotate(&pano, &report).save(path)?;
        tracing::info!("Annotated panorama written to {}", path.display());
    }

    if let Some(dir) = &args.crops_dir {
        std::fs::create_dir_all(dir)?;
        let crops = locator.extract_crops(&pano, &report);
        for (i, (crop, obj)) in crops.iter().zip(&report.objects).enumerate() {
            let path = dir.join(format!(
                "object_{:03}_{}_{}_{:.2}.png",
                i, obj.face_name, obj.label, obj.confidence
            ));
            crop.save(&path)?;
        }
        tracing::info!("{} crops written to {}", crops.len(), dir.display());
    }

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Report written to {}", args.out.display());
    Ok(())
}

// ── view ───────────────────────────────────────────────────────────────

fn run_view(args: &CliViewArgs) -> CliResult<()> {
    let pano = load_panorama(&args.panorama)?;
    let (bearing, heading) = args.bearing_and_heading()?;
    if args.survey {
        std::fs::create_dir_all(&args.out)?;
        let faces = render_survey(
            &pano,
            bearing,
            heading,
            args.width,
            args.interpolation.to_core(),
        )?;
        for f in &faces {
            let path = args.out.join(format!("{}.png", f.name));
            f.image.save(&path)?;
            tracing::info!("View '{}' written to {}", f.name, path.display());
        }
        return Ok(());
    }

    let view = BearingView {
        name: "view".to_string(),
        bearing_deg: bearing,
        pitch_deg: args.pitch,
        fov_deg: args.fov,
        width: args.width,
        height: args.height,
    };
    let layout = bearing_layout(std::slice::from_ref(&view), heading)?;
    let faces = equiscan::face::render_faces(&pano, &layout, args.interpolation.to_core());
    let face = faces.first().ok_or("view layout rendered no faces")?;
    face.image.save(&args.out)?;
    tracing::info!(
        "View at yaw {:.2} deg written to {}",
        face.orientation.yaw0().to_degrees(),
        args.out.display()
    );
    Ok(())
}

// ── layout-info ────────────────────────────────────────────────────────

fn run_layout_info(args: &LayoutArgs, panorama_width: u32) -> CliResult<()> {
    let layout = args.to_preset().build(panorama_width)?;
    println!("{}", layout.to_json_string()?);
    Ok(())
}
