//! # Certforge CLI
//!
//! Command-line interface for certificate generation.
//!
//! ## Usage
//!
//! ```bash
//! # Render every participant's certificate into a directory
//! certforge render --sheet lista.xlsx --template plantilla.png --out certificados/
//!
//! # Render one preview (the first participant, or a sample name)
//! certforge preview --sheet lista.xlsx --template plantilla.png --png preview.png
//!
//! # Email everyone through the delivery service
//! certforge send --sheet lista.xlsx --template plantilla.png --endpoint https://mailer/api/send
//!
//! # Inspect or change the stored layout
//! certforge layout show
//! certforge layout set --name-y 40 --date-x 80
//!
//! # Run the HTTP API
//! certforge serve --listen 0.0.0.0:8080
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use certforge::{
    CertError, Session,
    batch::{DOWNLOAD_PACING, SEND_PACING},
    delivery::HttpDelivery,
    layout::{LayoutConfig, LayoutStore},
    participant::{EventProfile, ParticipantId},
    render::{Template, font::FontSet},
    server::{self, AppState, ServerConfig},
};

/// Certforge - Participant certificate generator
#[derive(Parser, Debug)]
#[command(name = "certforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every participant's certificate to PNG files
    Render {
        #[command(flatten)]
        inputs: Inputs,

        #[command(flatten)]
        common: Common,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Pause between certificates in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Render a single preview certificate
    Preview {
        #[command(flatten)]
        inputs: Inputs,

        #[command(flatten)]
        common: Common,

        /// Preview this participant (by display name) instead of the first one
        #[arg(long)]
        name: Option<String>,

        /// Render the layout sample instead of a participant
        #[arg(long)]
        sample: bool,

        /// Output PNG file
        #[arg(long, value_name = "FILE", default_value = "preview.png")]
        png: PathBuf,
    },

    /// Render and email every valid participant
    Send {
        #[command(flatten)]
        inputs: Inputs,

        #[command(flatten)]
        common: Common,

        /// Delivery service endpoint
        #[arg(long, env = "CERTFORGE_DELIVERY_URL")]
        endpoint: String,

        /// Pause between emails in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Show or change the stored layout
    Layout {
        #[command(subcommand)]
        action: LayoutAction,

        /// Layout settings file
        #[arg(long, env = "CERTFORGE_LAYOUT_STORE", default_value = "certforge-settings.json")]
        layout_store: PathBuf,
    },

    /// Start the HTTP API server
    Serve {
        #[command(flatten)]
        common: Common,

        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Delivery service endpoint
        #[arg(long, env = "CERTFORGE_DELIVERY_URL")]
        endpoint: String,
    },
}

#[derive(Subcommand, Debug)]
enum LayoutAction {
    /// Print the stored layout as JSON
    Show,
    /// Update individual layout parameters and save
    Set {
        #[arg(long)]
        name_y: Option<f32>,
        #[arg(long)]
        name_font_size: Option<f32>,
        #[arg(long)]
        date_y: Option<f32>,
        #[arg(long)]
        date_font_size: Option<f32>,
        #[arg(long)]
        date_x: Option<f32>,
    },
}

/// Spreadsheet and template inputs.
#[derive(Args, Debug)]
struct Inputs {
    /// Participant workbook (.xlsx, .xls, .ods or .csv)
    #[arg(long)]
    sheet: PathBuf,

    /// Certificate template image (PNG or JPEG)
    #[arg(long)]
    template: PathBuf,
}

/// Settings shared by every rendering command.
#[derive(Args, Debug)]
struct Common {
    /// Base URL embedded in QR codes
    #[arg(long, env = "CERTFORGE_PUBLIC_URL", default_value = "http://localhost:8080")]
    public_url: String,

    /// Layout settings file
    #[arg(long, env = "CERTFORGE_LAYOUT_STORE", default_value = "certforge-settings.json")]
    layout_store: PathBuf,

    /// Regular outline font (TTF/OTF); the built-in bitmap face is used if unset
    #[arg(long, env = "CERTFORGE_FONT_REGULAR", requires = "font_bold")]
    font_regular: Option<PathBuf>,

    /// Bold outline font (TTF/OTF)
    #[arg(long, env = "CERTFORGE_FONT_BOLD", requires = "font_regular")]
    font_bold: Option<PathBuf>,

    /// Event profile JSON (title, dates, logos, signatures)
    #[arg(long, value_name = "FILE")]
    event: Option<PathBuf>,
}

impl Common {
    fn fonts(&self) -> Result<FontSet, CertError> {
        match (&self.font_regular, &self.font_bold) {
            (Some(regular), Some(bold)) => FontSet::from_files(regular, bold),
            _ => Ok(FontSet::Bitmap),
        }
    }

    fn profile(&self) -> Result<Option<EventProfile>, CertError> {
        let Some(path) = &self.event else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| CertError::Config(format!("Invalid event file {}: {}", path.display(), e)))
    }

    fn session(&self) -> Result<(Session, LayoutStore), CertError> {
        let store = LayoutStore::new(&self.layout_store);
        let mut session = Session::new(&self.public_url, self.fonts()?, store.load());
        if let Some(profile) = self.profile()? {
            session.set_profile(profile);
        }
        Ok((session, store))
    }
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("certforge=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn run() -> Result<(), CertError> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Render {
            inputs,
            common,
            out,
            pacing_ms,
        } => runtime.block_on(async {
            let (mut session, _) = common.session()?;
            load_inputs(&mut session, &inputs)?;
            std::fs::create_dir_all(&out)?;

            let pacing = pacing_ms.map(Duration::from_millis).unwrap_or(DOWNLOAD_PACING);
            println!(
                "Rendering {} certificates into {}...",
                session.participants().len(),
                out.display()
            );
            let report = session.download_all(&out, pacing).await;
            print_report(&report);
            Ok::<_, CertError>(())
        }),

        Commands::Preview {
            inputs,
            common,
            name,
            sample,
            png,
        } => runtime.block_on(async {
            let (mut session, _) = common.session()?;
            load_inputs(&mut session, &inputs)?;

            let bytes = if sample {
                session.layout_preview(name.as_deref()).await?
            } else {
                let id = pick_participant(&session, name.as_deref())?;
                session.preview(&id).await?
            };
            std::fs::write(&png, bytes)?;
            println!("Saved to {}", png.display());
            Ok::<_, CertError>(())
        }),

        Commands::Send {
            inputs,
            common,
            endpoint,
            pacing_ms,
        } => runtime.block_on(async {
            let (mut session, _) = common.session()?;
            load_inputs(&mut session, &inputs)?;
            let delivery = HttpDelivery::new(endpoint)?;

            let ids: Vec<ParticipantId> =
                session.participants().iter().map(|p| p.id.clone()).collect();
            let pacing = pacing_ms.map(Duration::from_millis).unwrap_or(SEND_PACING);
            println!("Sending {} certificates via {}...", ids.len(), delivery.endpoint());
            let report = session.send_bulk(&ids, &delivery, pacing).await;
            print_report(&report);
            Ok::<_, CertError>(())
        }),

        Commands::Layout {
            action,
            layout_store,
        } => {
            let store = LayoutStore::new(layout_store);
            let mut layout = store.load();
            match action {
                LayoutAction::Show => print_layout(&layout)?,
                LayoutAction::Set {
                    name_y,
                    name_font_size,
                    date_y,
                    date_font_size,
                    date_x,
                } => {
                    let LayoutConfig {
                        name_y: ny,
                        name_font_size: nfs,
                        date_y: dy,
                        date_font_size: dfs,
                        date_x: dx,
                    } = &mut layout;
                    for (slot, value) in [
                        (ny, name_y),
                        (nfs, name_font_size),
                        (dy, date_y),
                        (dfs, date_font_size),
                        (dx, date_x),
                    ] {
                        if let Some(value) = value {
                            *slot = value;
                        }
                    }
                    layout.validate()?;
                    store.save(&layout)?;
                    println!("Saved layout to {}", store.path().display());
                    print_layout(&layout)?;
                }
            }
            Ok(())
        }

        Commands::Serve {
            common,
            listen,
            endpoint,
        } => runtime.block_on(async {
            let (session, store) = common.session()?;
            let delivery = Arc::new(HttpDelivery::new(endpoint)?);
            let state = Arc::new(AppState::new(session, delivery, store));
            server::serve(ServerConfig { listen_addr: listen }, state).await
        }),
    }
}

/// Load the workbook and template named on the command line into the session.
fn load_inputs(session: &mut Session, inputs: &Inputs) -> Result<(), CertError> {
    let mime = mime_guess::from_path(&inputs.template).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(CertError::Decode(format!(
            "{} does not look like an image ({})",
            inputs.template.display(),
            mime
        )));
    }
    session.set_template(Template::from_bytes(std::fs::read(&inputs.template)?));

    let bytes = std::fs::read(&inputs.sheet)?;
    let summary = session.load_spreadsheet(&bytes, file_name(&inputs.sheet))?;
    println!(
        "Loaded {} participants ({} rows skipped)",
        summary.loaded, summary.skipped
    );
    Ok(())
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn pick_participant(session: &Session, name: Option<&str>) -> Result<ParticipantId, CertError> {
    let participants = session.participants();
    let found = match name {
        Some(name) => participants
            .iter()
            .find(|p| p.full_name.eq_ignore_ascii_case(name)),
        None => participants.first(),
    };
    found
        .map(|p| p.id.clone())
        .ok_or_else(|| CertError::NotFound(name.unwrap_or("participant").to_string()))
}

fn print_layout(layout: &LayoutConfig) -> Result<(), CertError> {
    let json = serde_json::to_string_pretty(layout)
        .map_err(|e| CertError::Config(format!("Failed to format layout: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_report(report: &certforge::batch::BatchReport) {
    println!("{}", report.summary());
    for failure in &report.errors {
        println!("  {}: {}", failure.name, failure.error);
    }
}
