//! Store identity and per-file context resolution

use crate::error::ImportError;
use crate::period::{Period, capitalize};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

/// The fixed set of retail locations feeding reports into the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    Aviatorov,
    Kozlovskaya,
    Diamant,
    Privoz,
    Bakhturova,
    Akhtubinsk,
    StroyGrad,
    Evropa,
    ParkKhaus,
    Tsum,
    Prostor,
}

impl Store {
    pub const ALL: [Store; 11] = [
        Store::Aviatorov,
        Store::Kozlovskaya,
        Store::Diamant,
        Store::Privoz,
        Store::Bakhturova,
        Store::Akhtubinsk,
        Store::StroyGrad,
        Store::Evropa,
        Store::ParkKhaus,
        Store::Tsum,
        Store::Prostor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Store::Aviatorov => "Авиаторов",
            Store::Kozlovskaya => "Козловская",
            Store::Diamant => "Диамант",
            Store::Privoz => "Привоз",
            Store::Bakhturova => "Бахтурова",
            Store::Akhtubinsk => "Ахтубинск",
            Store::StroyGrad => "СтройГрад",
            Store::Evropa => "Европа",
            Store::ParkKhaus => "Парк Хаус",
            Store::Tsum => "ЦУМ",
            Store::Prostor => "Простор",
        }
    }

    /// Lowercase substrings recognized in report file names
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Store::Aviatorov => &["авиаторов"],
            Store::Kozlovskaya => &["козловская", "санвэй", "санвей"],
            Store::Diamant => &["диамант", "цитрус"],
            Store::Privoz => &["привоз"],
            Store::Bakhturova => &["бахтурова"],
            Store::Akhtubinsk => &["ахтубинск"],
            Store::StroyGrad => &["стройград", "строй град"],
            Store::Evropa => &["европа"],
            Store::ParkKhaus => &["парк хаус", "паркхаус", "пх"],
            Store::Tsum => &["цум", "советница"],
            Store::Prostor => &["простор"],
        }
    }

    /// Lowercase keywords matched against ledger worksheet titles. Some
    /// stores appear in the ledger under a different brand name.
    pub fn sheet_keywords(self) -> &'static [&'static str] {
        match self {
            Store::Aviatorov => &["авиаторов"],
            Store::Kozlovskaya => &["козловская"],
            Store::Diamant => &["цитрус", "диамант"],
            Store::Privoz => &["привоз"],
            Store::Bakhturova => &["бахтурова"],
            Store::Akhtubinsk => &["ахтубинск"],
            Store::StroyGrad => &["стройград"],
            Store::Evropa => &["европа"],
            Store::ParkKhaus => &["парк хаус"],
            Store::Tsum => &["цум"],
            Store::Prostor => &["простор"],
        }
    }
}

/// Everything known about one input file before extraction starts.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub path: PathBuf,
    pub store: Store,
    pub period: Period,
}

/// Resolve store and period for a file, renaming it when the name lacks
/// an embedded period (skipped in dry-run).
pub fn resolve(
    path: &Path,
    fallback_period: Option<&str>,
    dry_run: bool,
) -> Result<FileContext, ImportError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    let store = detect_store(stem).ok_or_else(|| ImportError::StoreNotRecognized(file_name))?;

    let detected = detect_period(stem);
    let period_text = match detected.as_deref().or(fallback_period) {
        Some(text) => text.to_string(),
        None => return Err(ImportError::PeriodMissing),
    };
    let period = Period::parse(&period_text)?;

    let path = if detected.is_none() {
        rename_with_period(path, &period_text, dry_run)?
    } else {
        path.to_path_buf()
    };

    Ok(FileContext { path, store, period })
}

/// Case-insensitive alias match over the file stem; first matching store wins
pub fn detect_store(stem: &str) -> Option<Store> {
    let lower = stem.to_lowercase();
    Store::ALL
        .into_iter()
        .find(|store| store.aliases().iter().any(|alias| lower.contains(alias)))
}

/// Look for "месяц ГГГГ" anywhere in the file stem
pub fn detect_period(stem: &str) -> Option<String> {
    static PERIOD_RE: OnceLock<Regex> = OnceLock::new();
    let re = PERIOD_RE.get_or_init(|| {
        let months = crate::period::MONTH_NAMES.join("|");
        Regex::new(&format!(r"(?i)({months})\s+(\d{{4}})")).unwrap()
    });
    let captures = re.captures(stem)?;
    Some(format!("{} {}", capitalize(&captures[1].to_lowercase()), &captures[2]))
}

/// Embed the resolved period into the file name so reruns are
/// self-describing
fn rename_with_period(path: &Path, period: &str, dry_run: bool) -> Result<PathBuf, ImportError> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let new_name = format!("{stem} {period}{extension}");
    let new_path = path.with_file_name(&new_name);

    if dry_run {
        info!(file = %path.display(), %new_name, "[dry run] would rename file");
        return Ok(path.to_path_buf());
    }

    info!(file = %path.display(), %new_name, "renaming file to embed period");
    std::fs::rename(path, &new_path)?;
    Ok(new_path)
}
