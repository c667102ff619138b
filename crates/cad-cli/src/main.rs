use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use cad_ai::{
    GeminiClient, GeminiConfig, ModelPipeline, PipelineError, PipelineOutput, STL_FILE_NAME,
    process_response,
};
use cad_mesh::PreviewConfig;

type Flags = HashMap<String, String>;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "generate" => run_generate(&args[1..]),
        "build" => run_build(&args[1..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    eprintln!(
        "usage:\n  \
         cad generate --prompt <text> [--out {STL_FILE_NAME}] [--preview <file.png>]\n  \
         cad build --descriptors <reply.json> [--out {STL_FILE_NAME}] [--preview <file.png>]"
    );
}

fn run_generate(args: &[String]) -> Result<()> {
    let flags = parse_flags(args)?;
    let prompt = required_str(&flags, "--prompt")?;

    let config = GeminiConfig::from_env()?;
    log::info!("using model {}", config.model);
    let client = GeminiClient::new(config)?;
    let result = ModelPipeline::new(client).run(prompt);

    finish(&flags, result)
}

fn run_build(args: &[String]) -> Result<()> {
    let flags = parse_flags(args)?;
    let path = required_str(&flags, "--descriptors")?;
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;

    finish(&flags, process_response(raw, &PreviewConfig::default()))
}

fn finish(flags: &Flags, result: Result<PipelineOutput, PipelineError>) -> Result<()> {
    let output = match result {
        Ok(output) => output,
        Err(err) => {
            report_failure(&err);
            return Err(err.into());
        }
    };

    for warning in &output.warnings {
        eprintln!("warning: {warning}");
    }

    let out = optional_str(flags, "--out").unwrap_or(STL_FILE_NAME);
    write_artifact(out, &output.stl)?;
    println!(
        "wrote {out} ({} triangles, {} bytes)",
        output.mesh.triangle_count(),
        output.stl.len()
    );

    if let Some(preview) = optional_str(flags, "--preview") {
        write_artifact(preview, &output.preview_png)?;
        println!("wrote {preview}");
    }

    Ok(())
}

fn report_failure(err: &PipelineError) {
    for warning in err.warnings() {
        eprintln!("warning: {warning}");
    }
    if let Some(raw) = err.raw_response() {
        eprintln!("raw response:\n{raw}");
    }
}

fn write_artifact(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

fn parse_flags(args: &[String]) -> Result<Flags> {
    if args.len() % 2 != 0 {
        bail!("flags must be passed as --name value pairs");
    }

    let mut flags = HashMap::new();
    for pair in args.chunks_exact(2) {
        let key = &pair[0];
        if !key.starts_with("--") {
            bail!("expected a flag name, got `{key}`");
        }
        if flags.insert(key.clone(), pair[1].clone()).is_some() {
            bail!("duplicate flag: {key}");
        }
    }
    Ok(flags)
}

fn required_str<'a>(flags: &'a Flags, key: &str) -> Result<&'a str> {
    optional_str(flags, key).with_context(|| format!("missing required flag {key}"))
}

fn optional_str<'a>(flags: &'a Flags, key: &str) -> Option<&'a str> {
    flags.get(key).map(String::as_str)
}
