//! Sample sentence walkthrough.

use clap::Args;
use colored::Colorize;
use guard_anonymize::{PipelineConfig, ProcessOptions};

use crate::output::{self, CliError, OutputFormat};

use super::{announce_annotator, build_pipeline, Context};

const SAMPLES: [&str; 4] = [
    "김철수씨가 2023년 10월에 서울대병원에서 간암 진단을 받았습니다.",
    "박영희(010-1234-5678)는 삼성서울병원에서 수술을 받았다.",
    "환자는 내일 검사를 받을 예정입니다.",
    "이순신 교수는 연세의료원에서 백혈병 연구를 하고 있다.",
];

/// Run the pipeline over built-in sample sentences.
#[derive(Args)]
pub struct DemoCommand {
    /// Minimum risk weight to mask
    #[arg(long)]
    pub threshold: Option<u8>,
}

impl DemoCommand {
    /// Runs the demo.
    pub fn run(self, config: PipelineConfig, ctx: &Context) -> Result<(), CliError> {
        let pipeline = build_pipeline(config)?;
        announce_annotator(&pipeline, ctx);

        let mut options = ProcessOptions::new();
        if let Some(threshold) = self.threshold {
            options = options.with_threshold(threshold);
        }

        let table = ctx.format() == OutputFormat::Table;
        for (i, text) in SAMPLES.iter().enumerate() {
            if table {
                println!();
                println!("{}", format!("── Sample {} ──", i + 1).cyan().bold());
            }
            let trace = pipeline.process_traced(text, &options)?;
            output::print_trace(&trace, ctx.format(), ctx.verbose)?;
        }

        if table {
            println!();
            output::info(&format!("{} samples processed", SAMPLES.len()));
        }
        Ok(())
    }
}
