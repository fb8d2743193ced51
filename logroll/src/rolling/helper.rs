//! 시간 구간 계산과 파일 이름 유틸리티

use chrono::format::StrftimeItems;
use chrono::{DateTime, Offset, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, RollingError};

static TIME_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"%[%+A-Za-z]").expect("valid regex"));
static REPEATED_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*+").expect("valid regex"));

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// `t`를 `interval` 경계로 내림한 구간 시작 시각
///
/// 벽시계 시각을 UTC로 간주하여 내림한 뒤 원래 시간대로 되돌립니다.
/// 오프셋이 다른 두 시각이라도 벽시계 날짜가 같으면 같은 구간이 되므로
/// 하루 단위 회전이 항상 현지 자정에 맞춰집니다.
pub fn base_time<Tz: TimeZone>(t: &DateTime<Tz>, interval: Duration) -> DateTime<Tz> {
    let step = interval.as_nanos() as i128;
    if step == 0 {
        return t.clone();
    }

    let wall = t.naive_local().and_utc();
    let nanos = wall.timestamp() as i128 * NANOS_PER_SEC + wall.timestamp_subsec_nanos() as i128;
    let truncated = nanos - nanos.rem_euclid(step);

    let secs = truncated.div_euclid(NANOS_PER_SEC) as i64;
    let nsecs = truncated.rem_euclid(NANOS_PER_SEC) as u32;
    let Some(base) = DateTime::<Utc>::from_timestamp(secs, nsecs) else {
        return t.clone();
    };
    let base = base.naive_utc();

    // 서머타임으로 건너뛴 시각이면 같은 순간을 UTC 기준으로 해석
    let tz = t.timezone();
    tz.from_local_datetime(&base)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&base))
}

/// 구간 시작 시각 `base`의 다음 경계
///
/// 벽시계 시각에 간격을 더한 뒤 시간대로 되돌리므로, 서머타임 전환으로 23시간이나
/// 25시간인 날에도 다음 경계는 현지 자정입니다. 더한 시각이 서머타임으로 건너뛴
/// 구간이면 `base`의 오프셋으로 해석하여 건너뛴 구간이 끝나는 순간을 씁니다.
/// 표현할 수 없으면 `None`.
pub fn next_boundary<Tz: TimeZone>(
    base: &DateTime<Tz>,
    interval: Duration,
) -> Option<DateTime<Tz>> {
    let step = chrono::Duration::from_std(interval).ok()?;
    let wall = base.naive_local().checked_add_signed(step)?;

    let tz = base.timezone();
    if let Some(next) = tz.from_local_datetime(&wall).earliest() {
        return Some(next);
    }

    let offset = chrono::Duration::seconds(base.offset().fix().local_minus_utc() as i64);
    let utc = wall.checked_sub_signed(offset)?;
    Some(tz.from_utc_datetime(&utc))
}

/// 이름 패턴을 `t` 시각으로 렌더링
pub fn generate_file_name<Tz>(pattern: &str, t: &DateTime<Tz>) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut name = String::with_capacity(pattern.len() + 16);
    write!(name, "{}", t.format_with_items(StrftimeItems::new(pattern))).map_err(|_| {
        RollingError::config(format!("name_pattern is not a valid time format: {pattern}"))
    })?;
    Ok(name)
}

/// 이름 패턴의 시간 토큰을 `*`로 바꾼 glob 패턴
///
/// `"app.%Y-%m-%d"` → `"app.*-*-*"`, 연속된 `*`는 하나로 합칩니다.
pub fn to_glob_pattern(pattern: &str) -> String {
    let replaced = TIME_TOKEN.replace_all(pattern, "*");
    REPEATED_STAR.replace_all(&replaced, "*").into_owned()
}

/// `dir` 안에서 `glob_pattern`과 일치하는 경로 목록
pub fn list_files(dir: &Path, glob_pattern: &str) -> Result<Vec<PathBuf>> {
    let dir = dir
        .to_str()
        .ok_or_else(|| RollingError::config(format!("out_dir is not valid UTF-8: {}", dir.display())))?;

    let full = format!("{}/{}", glob::Pattern::escape(dir), glob_pattern);
    let paths = glob::glob(&full)
        .map_err(|e| RollingError::config(format!("invalid glob pattern {full}: {e}")))?;

    Ok(paths.filter_map(|entry| entry.ok()).collect())
}
