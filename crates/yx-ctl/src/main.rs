//! yx-ctl — command-line sender/receiver harness for the YX protocol.
//!
//! Senders exit 0 after one successful emit and print SENT. The receiver
//! binds, waits for one message, and prints RECEIVED or FAILED: <reason>.
//! Test identity is fixed so independent implementations can interoperate
//! without coordination: GUID 0x01*6, HMAC key 0x00*32, AEAD key 0x42*32,
//! port 49999 (overridable via TEST_YX_PORT).

use anyhow::{Context, Result};

mod cmd;

fn print_usage() {
    println!("Usage: yx-ctl <command> [options]");
    println!();
    println!("Sending");
    println!("  send-text [--message <json>]       Emit one Protocol 0 datagram, print SENT");
    println!("  send-binary [--size <n>]           Emit one chunked Protocol 1 message, print SENT");
    println!("    --opts <n>                       protoOpts bits: 1=compress, 2=encrypt");
    println!("    --channel <n>                    Channel ID (default 0)");
    println!("    --chunk-size <n>                 Max chunk payload bytes (default 1024)");
    println!("    --fill <hex-byte>                Fill byte for generated payload (default ab)");
    println!();
    println!("Receiving");
    println!("  recv [--timeout <secs>]            Await one message, print RECEIVED or FAILED");
    println!();
    println!("Conformance");
    println!("  vectors generate <path>            Write the MAC conformance vector file");
    println!("  vectors check <path>               Validate this build against a vector file");
    println!();
    println!("Common options:");
    println!("  --host <host>                      Peer host (default 127.0.0.1)");
    println!("  --port <port>                      Peer/bind port (default 49999 or $TEST_YX_PORT)");
    println!();
    println!("Examples:");
    println!("  yx-ctl recv");
    println!("  yx-ctl send-text --message '{{\"method\":\"test\",\"params\":{{\"value\":42}}}}'");
    println!("  yx-ctl send-binary --size 2500 --opts 3");
    println!("  yx-ctl vectors generate tests/integration/vectors/yx_vectors.json");
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity; harness output stays on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut host = "127.0.0.1".to_string();
    let mut port = cmd::test_port();
    let mut message: Option<String> = None;
    let mut size: usize = 2500;
    let mut opts: u8 = 0;
    let mut channel: u16 = 0;
    let mut chunk_size: usize = 1024;
    let mut fill: u8 = 0xAB;
    let mut timeout_secs: f64 = 5.0;

    let mut remaining: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let take = |args: &[String], i: usize, flag: &str| -> Result<String> {
            args.get(i + 1)
                .cloned()
                .with_context(|| format!("{flag} requires a value"))
        };
        match args[i].as_str() {
            "--host" => {
                host = take(&args, i, "--host")?;
                i += 1;
            }
            "--port" => {
                port = take(&args, i, "--port")?.parse().context("--port must be a number")?;
                i += 1;
            }
            "--message" => {
                message = Some(take(&args, i, "--message")?);
                i += 1;
            }
            "--size" => {
                size = take(&args, i, "--size")?.parse().context("--size must be a number")?;
                i += 1;
            }
            "--opts" => {
                opts = take(&args, i, "--opts")?.parse().context("--opts must be 0..3")?;
                i += 1;
            }
            "--channel" => {
                channel = take(&args, i, "--channel")?
                    .parse()
                    .context("--channel must be a number")?;
                i += 1;
            }
            "--chunk-size" => {
                chunk_size = take(&args, i, "--chunk-size")?
                    .parse()
                    .context("--chunk-size must be a number")?;
                i += 1;
            }
            "--fill" => {
                let v = take(&args, i, "--fill")?;
                let bytes = hex::decode(&v).context("--fill must be one hex byte")?;
                anyhow::ensure!(bytes.len() == 1, "--fill must be one hex byte");
                fill = bytes[0];
                i += 1;
            }
            "--timeout" => {
                timeout_secs = take(&args, i, "--timeout")?
                    .parse()
                    .context("--timeout must be seconds")?;
                i += 1;
            }
            other => remaining.push(other.to_string()),
        }
        i += 1;
    }

    let remaining_refs: Vec<&str> = remaining.iter().map(|s| s.as_str()).collect();

    match remaining_refs.as_slice() {
        ["send-text"] => cmd::send::cmd_send_text(&host, port, message.as_deref()).await,
        ["send-binary"] => {
            cmd::send::cmd_send_binary(&host, port, size, fill, opts, channel, chunk_size).await
        }
        ["recv"] => cmd::recv::cmd_recv(port, timeout_secs).await,
        ["vectors", "generate", path] => cmd::vectors::cmd_generate(path),
        ["vectors", "check", path] => cmd::vectors::cmd_check(path),
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
