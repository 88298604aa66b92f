use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use bresser_rs::config::parse_id_list;
use bresser_rs::constants::{DEFAULT_RAINGAUGE_MAX, LIGHTNING_COUNT_MAX_1600, MSG_BUF_SIZE, PAYLOAD_SIZE, PREAMBLE_BYTE};
use bresser_rs::util::hex::parse_hex_lenient;
use bresser_rs::util::weather::{dew_point, perceived_temperature, winddir_to_compass, windspeed_ms_to_bft};
use bresser_rs::{
    init_logger_with_default, log_info, CounterConfig, DecodeStatus, DecoderFlags, FileStore, Lightning, MockRadio,
    PacketReadyFlag, Payload, RainGauge, Reading, ReceiveFlags, ReceiverConfig, SlotManager,
};

#[derive(Parser)]
#[command(name = "bresser-cli")]
#[command(about = "CLI tool for Bresser weather sensor messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single message given as hex
    Decode {
        hex: String,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        rssi: f32,
        /// Enabled decoder mask
        #[arg(long, value_parser = parse_mask)]
        decoders: Option<u8>,
    },
    /// Decode a capture file with one hex message per line
    Replay {
        file: PathBuf,
        #[arg(long, default_value_t = 4)]
        slots: u8,
        /// Rain gauge wrap value in mm
        #[arg(long, default_value_t = DEFAULT_RAINGAUGE_MAX)]
        rain_max: f32,
    },
    /// Show or change the stored receiver configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        max_sensors: Option<u8>,
        /// Comma separated hex ids, empty to clear
        #[arg(long)]
        include: Option<String>,
        #[arg(long)]
        exclude: Option<String>,
        #[arg(long, value_parser = parse_mask)]
        decoders: Option<u8>,
        #[arg(long, value_parser = parse_mask)]
        rx_flags: Option<u8>,
    },
}

fn parse_mask(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid mask '{s}': {e}"))
}

/// Strip the preamble from a receive buffer, accepting bare payloads too
fn payload(bytes: &[u8]) -> Result<&[u8]> {
    match bytes.len() {
        MSG_BUF_SIZE if bytes[0] == PREAMBLE_BYTE => Ok(&bytes[1..]),
        MSG_BUF_SIZE => bail!("27 byte message must start with 0x{PREAMBLE_BYTE:02X}"),
        PAYLOAD_SIZE => Ok(bytes),
        n => bail!("expected {PAYLOAD_SIZE} or {MSG_BUF_SIZE} bytes, got {n}"),
    }
}

/// Split an optional leading Unix timestamp from a capture line
fn split_timestamp(line: &str) -> (Option<i64>, &str) {
    if let Some((first, rest)) = line.split_once(char::is_whitespace) {
        if (9..=11).contains(&first.len()) && first.bytes().all(|b| b.is_ascii_digit()) {
            return (first.parse().ok(), rest.trim());
        }
    }
    (None, line)
}

fn print_reading(r: &Reading) {
    println!("{r}");
    if let Payload::Weather(w) = &r.payload {
        if w.wind_ok {
            println!(
                "  wind: {} ({} Bft)",
                winddir_to_compass(w.wind_direction_deg),
                windspeed_ms_to_bft(w.wind_avg_meter_sec)
            );
        }
        if w.temp_ok && w.humidity_ok {
            println!("  dew point: {:.1} C", dew_point(w.temp_c, w.humidity as f32));
            if w.wind_ok {
                println!(
                    "  feels like: {:.1} C",
                    perceived_temperature(w.temp_c, w.wind_avg_meter_sec, w.humidity as f32)
                );
            }
        }
    }
}

fn decode(hex: &str, rssi: f32, decoders: Option<u8>) -> Result<()> {
    let bytes = parse_hex_lenient(hex).context("Failed to parse message")?;
    let msg = payload(&bytes)?;
    let enabled = decoders.map(DecoderFlags::from_bits_retain).unwrap_or_default();

    let mut slots = SlotManager::new(1);
    let result = bresser_rs::dispatch(msg, rssi, &mut slots, enabled);
    match result.slot.and_then(|i| slots.get(i)) {
        Some(reading) if result.status == DecodeStatus::Ok => print_reading(reading),
        _ => bail!("Message not decoded: {}", result.status),
    }
    Ok(())
}

fn replay(file: &Path, slots: u8, rain_max: f32) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let flag = PacketReadyFlag::new();
    let config = ReceiverConfig {
        max_sensors: slots.max(1),
        rx_flags: ReceiveFlags::empty(),
        ..Default::default()
    };
    let mut ws = bresser_rs::WeatherSensor::with_config(MockRadio::new(flag.clone()), flag, &config);
    let mut rain = RainGauge::new(rain_max, CounterConfig::default());
    let mut lightning = Lightning::new(LIGHTNING_COUNT_MAX_1600, CounterConfig::default());
    let mut clock = chrono::Utc::now().timestamp();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (ts, hex) = split_timestamp(line);
        let bytes = match parse_hex_lenient(hex) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("line {}: {e}", lineno + 1);
                continue;
            }
        };
        let mut buf = Vec::with_capacity(MSG_BUF_SIZE);
        if bytes.len() == PAYLOAD_SIZE {
            buf.push(PREAMBLE_BYTE);
        }
        buf.extend_from_slice(&bytes);
        ws.radio_mut().push(buf, 0.0);

        let status = ws.get_message();
        let timestamp = ts.unwrap_or(clock);
        clock = timestamp + 60;
        if status != DecodeStatus::Ok {
            log::info!("line {}: {status}", lineno + 1);
            continue;
        }
        let Some(reading) = ws.last_decoded() else {
            continue;
        };
        print_reading(reading);

        match &reading.payload {
            Payload::Weather(w) if w.rain_ok => rain.update(timestamp, w.rain_mm, reading.startup),
            Payload::Lightning(l) => lightning.update(timestamp, l.strike_count, l.distance_km, reading.startup),
            _ => {}
        }
    }

    let stats = ws.stats();
    log_info(&format!(
        "received {} ok {} invalid {} skipped {} full {} bad preamble {}",
        stats.received, stats.ok, stats.invalid, stats.skipped, stats.full, stats.bad_preamble
    ));

    if rain.last_update().is_some() {
        let hour = rain.past_hour();
        let day = rain.past_24h();
        println!(
            "rain: past hour {:.1} mm (valid: {}), past 24 h {:.1} mm (valid: {})",
            hour.rain_mm, hour.valid, day.rain_mm, day.valid
        );
        println!(
            "rain: today {:?} mm, this week {:?} mm, this month {:?} mm",
            rain.current_day(),
            rain.current_week(),
            rain.current_month()
        );
    }
    if lightning.last_update().is_some() {
        let hour = lightning.past_hour();
        println!("lightning: past hour {} strikes (valid: {})", hour.sum, hour.valid);
        if let Some(ev) = lightning.last_event() {
            println!("lightning: last event at {} with {} strikes, {} km", ev.timestamp, ev.events, ev.distance_km);
        }
    }
    Ok(())
}

fn config(action: ConfigAction, dir: &Path) -> Result<()> {
    let mut store = FileStore::open(dir).with_context(|| format!("Failed to open store in {}", dir.display()))?;
    let mut cfg = ReceiverConfig::load(&store);

    match action {
        ConfigAction::Show => {}
        ConfigAction::Set {
            max_sensors,
            include,
            exclude,
            decoders,
            rx_flags,
        } => {
            if let Some(n) = max_sensors {
                cfg.max_sensors = n;
            }
            if let Some(ids) = include {
                cfg.include_ids = parse_id_list(&ids).context("Invalid include list")?;
            }
            if let Some(ids) = exclude {
                cfg.exclude_ids = parse_id_list(&ids).context("Invalid exclude list")?;
            }
            if let Some(mask) = decoders {
                cfg.decoders = DecoderFlags::from_bits_retain(mask);
            }
            if let Some(mask) = rx_flags {
                cfg.rx_flags = ReceiveFlags::from_bits_retain(mask);
            }
            cfg.save(&mut store).context("Failed to save configuration")?;
            log_info("Configuration saved");
        }
    }

    let ids = |ids: &[u32]| ids.iter().map(|id| format!("{id:08X}")).collect::<Vec<_>>().join(", ");
    println!("max sensors: {}", cfg.max_sensors);
    println!("include ids: [{}]", ids(&cfg.include_ids));
    println!("exclude ids: [{}]", ids(&cfg.exclude_ids));
    println!("decoders:    0x{:02X} {:?}", cfg.decoders.bits(), cfg.decoders);
    println!("rx flags:    0x{:02X} {:?}", cfg.rx_flags.bits(), cfg.rx_flags);
    Ok(())
}

fn main() -> Result<()> {
    init_logger_with_default("info");

    let cli = Cli::parse();
    match cli.command {
        Commands::Decode { hex, rssi, decoders } => decode(&hex, rssi, decoders),
        Commands::Replay { file, slots, rain_max } => replay(&file, slots, rain_max),
        Commands::Config { action, dir } => config(action, &dir),
    }
}
