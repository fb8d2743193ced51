//! 표준 입력을 시간 기반 회전 파일로 기록하는 도구
//!
//! ```text
//! some-server | logroll [OUT_DIR] [NAME_PATTERN] [LINK_NAME]
//! ```
//!
//! 인자가 없으면 `LOGROLL_*` 환경변수(.env 포함)에서 설정을 읽습니다.

use anyhow::{Context, Result};
use std::io::{self, BufRead};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use logroll::{RollingError, RotateOptions, RotateWriter};

const ENV_PREFIX: &str = "LOGROLL";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut options = RotateOptions::from_env(ENV_PREFIX);
    let mut args = std::env::args().skip(1);
    if let Some(out_dir) = args.next() {
        options.out_dir = out_dir.into();
    }
    if let Some(pattern) = args.next() {
        options.name_pattern = pattern;
    }
    if let Some(link_name) = args.next() {
        options = options.with_link_name(link_name);
    }

    let writer = RotateWriter::new(options).context("회전 로그 작성기 생성 실패")?;
    info!(
        out_dir = %writer.options().out_dir.display(),
        pattern = %writer.options().name_pattern,
        "표준 입력 기록 시작"
    );

    let mut reader = io::stdin().lock();
    let mut line = Vec::with_capacity(1024);
    let mut lines: u64 = 0;

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).context("표준 입력 읽기 실패")?;
        if read == 0 {
            break;
        }

        match writer.write(&line) {
            Ok(_) => lines += 1,
            Err(RollingError::Closed) => break,
            Err(e) => {
                // 데이터는 이미 큐에 들어감
                lines += 1;
                warn!(error = %e, "이전 쓰기 실패");
            }
        }
    }

    writer.close().context("회전 로그 작성기 종료 실패")?;
    info!(lines, "표준 입력 종료");

    Ok(())
}
