//! nnfpga-link – UART host tool for the NN inference accelerator.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use nnfpga_link::codec::{FixedPointCodec, FixedPointConfig, Latency};
use nnfpga_link::config::LinkConfig;
use nnfpga_link::fixture::{load_hex_file, save_hex_file};
use nnfpga_link::protocol::{decode_frame, encode_frame, PacketType};
use nnfpga_link::report::{format_values, write_stdout_json, write_stdout_line};
use nnfpga_link::session::{SessionConfig, SessionDriver};
use nnfpga_link::transport::open_serial;
use tokio_serial::SerialStream;

/// nnfpga-link – send frames to the accelerator and measure inference latency.
#[derive(Parser, Debug)]
#[command(name = "nnfpga-link", version)]
struct Cli {
    /// TOML config file (port, baud, timeout, crc, fixed_point).
    #[arg(long, global = true, default_value = "nnfpga-link.toml")]
    config: PathBuf,
    /// Debug logging.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args, Debug, Clone)]
struct LinkArgs {
    /// UART device, e.g. /dev/ttyUSB0.
    #[arg(long)]
    port: Option<String>,
    /// UART baud rate.
    #[arg(long)]
    baud: Option<u32>,
    /// Per-read timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Frames carry a CRC-16 trailer.
    #[arg(long)]
    crc: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Send one request fixture and read one response.
    Send {
        #[command(flatten)]
        link: LinkArgs,
        /// Request frame (hex fixture).
        #[arg(long)]
        req: PathBuf,
        /// Expected response frame (hex fixture).
        #[arg(long)]
        expect: Option<PathBuf>,
        /// Where to save the response.
        #[arg(long, default_value = "sim/fixtures/uart_last_rsp.hex")]
        out: PathBuf,
    },
    /// Measure cycles per inference from STATUS counters.
    Latency {
        #[command(flatten)]
        link: LinkArgs,
        /// INFER_REQ frame (hex fixture).
        #[arg(long)]
        req: PathBuf,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print one STATUS snapshot.
    Status {
        #[command(flatten)]
        link: LinkArgs,
    },
    /// Decode fixture frames offline.
    Decode {
        /// Frames to decode (hex fixtures).
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        crc: bool,
        /// Interpret elements as unsigned.
        #[arg(long)]
        unsigned: bool,
    },
    /// Quantize values into a framed fixture.
    Pack {
        #[arg(long = "type", value_enum, default_value = "infer-req")]
        packet_type: PackType,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        crc: bool,
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PackType {
    InferReq,
    InferRsp,
}

impl From<PackType> for PacketType {
    fn from(value: PackType) -> Self {
        match value {
            PackType::InferReq => PacketType::InferReq,
            PackType::InferRsp => PacketType::InferRsp,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "nnfpga_link=debug"
    } else {
        "nnfpga_link=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let file_cfg = LinkConfig::load(&cli.config)?;

    match cli.cmd {
        Cmd::Send {
            link,
            req,
            expect,
            out,
        } => run_send(&file_cfg, &link, req, expect, out).await,
        Cmd::Latency { link, req, json } => run_latency(&file_cfg, &link, req, json).await,
        Cmd::Status { link } => run_status(&file_cfg, &link).await,
        Cmd::Decode {
            files,
            crc,
            unsigned,
        } => run_decode(&file_cfg, files, crc || file_cfg.crc, unsigned).await,
        Cmd::Pack {
            packet_type,
            out,
            crc,
            values,
        } => run_pack(&file_cfg, packet_type.into(), out, crc || file_cfg.crc, &values).await,
    }
}

/// Merge CLI flags over the config file and open the session.
fn open_session(file_cfg: &LinkConfig, link: &LinkArgs) -> Result<SessionDriver<SerialStream>> {
    let port = match link.port.as_ref().or(file_cfg.port.as_ref()) {
        Some(port) => port.clone(),
        None => bail!("no serial port given (use --port or set `port` in the config file)"),
    };
    let baud = link.baud.unwrap_or(file_cfg.baud);

    let mut session_cfg: SessionConfig = file_cfg.session_config();
    if let Some(ms) = link.timeout_ms {
        session_cfg = session_cfg.with_read_timeout(Duration::from_millis(ms));
    }
    if link.crc {
        session_cfg = session_cfg.with_crc(true);
    }

    let stream = open_serial(&port, baud).with_context(|| format!("opening {}", port))?;
    Ok(SessionDriver::start(stream, session_cfg)?)
}

async fn run_send(
    file_cfg: &LinkConfig,
    link: &LinkArgs,
    req: PathBuf,
    expect: Option<PathBuf>,
    out: PathBuf,
) -> Result<ExitCode> {
    let request = load_hex_file(&req)
        .await
        .with_context(|| format!("loading {}", req.display()))?;
    tracing::debug!("Loaded {} request bytes from {}", request.len(), req.display());

    let expected = match expect {
        Some(path) if path.exists() => Some(load_hex_file(&path).await?),
        Some(path) => {
            tracing::warn!("Expected fixture {} not found, skipping compare", path.display());
            None
        }
        None => None,
    };

    let mut session = open_session(file_cfg, link)?;
    let outcome = session.one_shot(&request, expected.as_deref()).await?;

    save_hex_file(&out, &outcome.response).await?;
    write_stdout_line(&format!("Wrote response to {}", out.display()))?;

    if let Some(packet) = &outcome.packet {
        tracing::info!(
            "Response type 0x{:02X}, payload length {}",
            packet.packet_type.code(),
            packet.payload_len()
        );
    }

    match outcome.matches {
        Some(true) => {
            write_stdout_line("Match: response equals expected bytes")?;
            Ok(ExitCode::SUCCESS)
        }
        Some(false) => {
            write_stdout_line("Mismatch: response does not match expected bytes")?;
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

async fn run_latency(
    file_cfg: &LinkConfig,
    link: &LinkArgs,
    req: PathBuf,
    json: bool,
) -> Result<ExitCode> {
    let request = load_hex_file(&req)
        .await
        .with_context(|| format!("loading {}", req.display()))?;

    let mut session = open_session(file_cfg, link)?;
    let report = session.measure_latency(&request).await?;

    if json {
        write_stdout_json(&report)?;
    } else {
        match report.latency {
            Latency::CyclesPerInfer(cycles) => {
                write_stdout_line(&format!("Inferences: {}", report.delta.infers))?;
                write_stdout_line(&format!("Delta cycles: {}", report.delta.cycles))?;
                write_stdout_line(&format!("Latency (cycles per inference): {}", cycles))?;
            }
            Latency::NoNewInferences => {
                write_stdout_line("No new inferences counted; cannot compute latency.")?;
            }
        }
        tracing::debug!("Status before: {:?}", report.before);
        tracing::debug!("Status after : {:?}", report.after);
    }

    Ok(match report.latency {
        Latency::CyclesPerInfer(_) => ExitCode::SUCCESS,
        Latency::NoNewInferences => ExitCode::FAILURE,
    })
}

async fn run_status(file_cfg: &LinkConfig, link: &LinkArgs) -> Result<ExitCode> {
    let mut session = open_session(file_cfg, link)?;
    let status = session.status().await?;
    write_stdout_json(&status)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_decode(
    file_cfg: &LinkConfig,
    files: Vec<PathBuf>,
    crc: bool,
    unsigned: bool,
) -> Result<ExitCode> {
    let base = file_cfg.fixed_point;
    let fixed_point = FixedPointConfig::new(base.data_width(), base.frac_width(), !unsigned)?;

    for path in files {
        let bytes = load_hex_file(&path)
            .await
            .with_context(|| format!("loading {}", path.display()))?;
        let packet =
            decode_frame(&bytes, crc).with_context(|| format!("decoding {}", path.display()))?;

        let values = FixedPointCodec::decode_values(packet.payload(), fixed_point)?;
        write_stdout_line(&format!(
            "{}: type 0x{:02X}, {} values: {}",
            path.display(),
            packet.packet_type.code(),
            values.len(),
            format_values(&values)
        ))?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_pack(
    file_cfg: &LinkConfig,
    packet_type: PacketType,
    out: PathBuf,
    crc: bool,
    values: &[f64],
) -> Result<ExitCode> {
    let payload = FixedPointCodec::encode(values, file_cfg.fixed_point);
    let frame = encode_frame(packet_type, &payload, crc)?;
    save_hex_file(&out, &frame).await?;

    let quantized = FixedPointCodec::decode_values(&payload, file_cfg.fixed_point)?;
    write_stdout_line(&format!(
        "Wrote {} ({} bytes), quantized values: {}",
        out.display(),
        frame.len(),
        format_values(&quantized)
    ))?;
    Ok(ExitCode::SUCCESS)
}
