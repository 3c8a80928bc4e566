//! Static robocopy option catalog.
//!
//! Entries are grouped by the section the editor shows them in. The catalog is
//! immutable and only ever read; editing state lives in `JobConfiguration`.

use crate::model::{OptionValue, SelectedOptions};

pub const DEFAULT_EXECUTABLE: &str = "robocopy";
pub const SIMULATE_FLAG: &str = "/L";
pub const EXCLUDE_FILES_FLAG: &str = "/XF";
pub const EXCLUDE_DIRS_FLAG: &str = "/XD";
pub const INCLUDE_FILES_FLAG: &str = "/IF";

const FILE_ATTRIBUTES: &str = "RASHCNETO";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Boolean,
    Integer,
    Text,
    CharSet,
    MultilineList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Copy,
    Selection,
    Retry,
    Logging,
    Job,
    Other,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Copy,
        Section::Selection,
        Section::Retry,
        Section::Logging,
        Section::Job,
        Section::Other,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Copy => "Copy",
            Section::Selection => "File selection",
            Section::Retry => "Retry",
            Section::Logging => "Logging",
            Section::Job => "Jobs & profiles",
            Section::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionCatalogEntry {
    pub flag: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
    pub section: Section,
    /// Inclusive bounds for `Integer` options.
    pub bounds: Option<(i64, i64)>,
    /// Allowed characters for `CharSet` options.
    pub alphabet: &'static str,
    pub placeholder: &'static str,
    /// The option can delete files at the destination or source.
    pub destructive: bool,
}

impl OptionCatalogEntry {
    const fn new(
        section: Section,
        kind: OptionKind,
        flag: &'static str,
        label: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            flag,
            label,
            description,
            kind,
            section,
            bounds: None,
            alphabet: "",
            placeholder: "",
            destructive: false,
        }
    }

    const fn bounded(mut self, min: i64, max: i64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    const fn chars(mut self, alphabet: &'static str) -> Self {
        self.alphabet = alphabet;
        self
    }

    const fn hint(mut self, placeholder: &'static str) -> Self {
        self.placeholder = placeholder;
        self
    }

    const fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    /// Flag token without any embedded placeholder (`/MAX:n` → `/MAX`).
    pub fn base_flag(&self) -> &'static str {
        match self.flag.split_once(':') {
            Some((prefix, _)) => prefix,
            None => self.flag,
        }
    }

    /// Clamp an integer into this entry's bounds.
    pub fn clamp(&self, value: i64) -> i64 {
        match self.bounds {
            Some((min, max)) => value.clamp(min, max),
            None => value,
        }
    }
}

use OptionKind::{Boolean, CharSet, Integer, MultilineList, Text};
use Section::{Job, Logging, Other, Retry, Selection};

const fn entry(
    section: Section,
    kind: OptionKind,
    flag: &'static str,
    label: &'static str,
    description: &'static str,
) -> OptionCatalogEntry {
    OptionCatalogEntry::new(section, kind, flag, label, description)
}

pub static CATALOG: &[OptionCatalogEntry] = &[
    // Copy
    entry(
        Section::Copy,
        Boolean,
        "/S",
        "Subdirectories",
        "Copy subdirectories, excluding empty ones",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/E",
        "Subdirectories (with empty)",
        "Copy subdirectories, including empty ones",
    ),
    entry(
        Section::Copy,
        Integer,
        "/LEV",
        "Depth limit",
        "Copy only the top N levels of the source tree",
    )
    .bounded(1, 999)
    .hint("n"),
    entry(
        Section::Copy,
        Boolean,
        "/Z",
        "Restartable mode",
        "Copy files in restartable mode",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/B",
        "Backup mode",
        "Copy files in backup mode",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/ZB",
        "Restartable, fall back to backup",
        "Use restartable mode; if access is denied use backup mode",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/J",
        "Unbuffered I/O",
        "Copy using unbuffered I/O (recommended for large files)",
    ),
    entry(
        Section::Copy,
        CharSet,
        "/COPY",
        "File properties",
        "What to copy for files: D=Data A=Attributes T=Timestamps S=Security O=Owner U=aUditing",
    )
    .chars("DATSOU"),
    entry(
        Section::Copy,
        CharSet,
        "/DCOPY",
        "Directory properties",
        "Directory info to copy: D=Data A=Attributes T=Timestamps E=EAs X=Skip alt streams",
    )
    .chars("DATEX"),
    entry(
        Section::Copy,
        Boolean,
        "/SEC",
        "Security",
        "Copy files with security (equivalent to /COPY:DATS)",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/COPYALL",
        "Everything",
        "Copy all file info (equivalent to /COPY:DATSOU)",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/NOCOPY",
        "No file info",
        "Copy no file info (useful with /PURGE)",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/SECFIX",
        "Fix security",
        "Fix file security on all files, even skipped ones",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/TIMFIX",
        "Fix times",
        "Fix file times on all files, even skipped ones",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/PURGE",
        "Purge",
        "Delete destination files and directories that no longer exist in the source",
    )
    .destructive(),
    entry(
        Section::Copy,
        Boolean,
        "/MIR",
        "Mirror",
        "Mirror a directory tree (equivalent to /E plus /PURGE)",
    )
    .destructive(),
    entry(
        Section::Copy,
        Boolean,
        "/MOV",
        "Move files",
        "Move files (delete from source after copying)",
    )
    .destructive(),
    entry(
        Section::Copy,
        Boolean,
        "/MOVE",
        "Move files and directories",
        "Move files and directories (delete from source after copying)",
    )
    .destructive(),
    entry(
        Section::Copy,
        CharSet,
        "/A+",
        "Add attributes",
        "Add the given attributes to copied files",
    )
    .chars("RASHCNET"),
    entry(
        Section::Copy,
        CharSet,
        "/A-",
        "Remove attributes",
        "Remove the given attributes from copied files",
    )
    .chars("RASHCNET"),
    entry(
        Section::Copy,
        Boolean,
        "/CREATE",
        "Create only",
        "Create directory tree and zero-length files only",
    ),
    entry(
        Section::Copy,
        Boolean,
        "/SL",
        "Copy symbolic links",
        "Copy symbolic links instead of their targets",
    ),
    // File selection
    entry(
        Selection,
        Boolean,
        "/A",
        "Archive only",
        "Copy only files with the Archive attribute set",
    ),
    entry(
        Selection,
        Boolean,
        "/M",
        "Archive and reset",
        "Copy only files with the Archive attribute and reset it",
    ),
    entry(
        Selection,
        CharSet,
        "/IA",
        "Include attributes",
        "Include only files with any of the given attributes set",
    )
    .chars(FILE_ATTRIBUTES),
    entry(
        Selection,
        CharSet,
        "/XA",
        "Exclude attributes",
        "Exclude files with any of the given attributes set",
    )
    .chars(FILE_ATTRIBUTES),
    entry(
        Selection,
        MultilineList,
        EXCLUDE_FILES_FLAG,
        "Exclude files",
        "File names or wildcards to exclude, one per line",
    )
    .hint("*.tmp"),
    entry(
        Selection,
        MultilineList,
        EXCLUDE_DIRS_FLAG,
        "Exclude directories",
        "Directory names or paths to exclude, one per line",
    )
    .hint("node_modules"),
    entry(
        Selection,
        MultilineList,
        INCLUDE_FILES_FLAG,
        "Include files",
        "File names or wildcards to include, one per line",
    )
    .hint("*.docx"),
    entry(
        Selection,
        Boolean,
        "/XC",
        "Exclude changed",
        "Exclude changed files",
    ),
    entry(
        Selection,
        Boolean,
        "/XN",
        "Exclude newer",
        "Exclude newer files",
    ),
    entry(
        Selection,
        Boolean,
        "/XO",
        "Exclude older",
        "Exclude older files",
    ),
    entry(
        Selection,
        Boolean,
        "/XX",
        "Exclude extra",
        "Exclude extra files and directories",
    ),
    entry(
        Selection,
        Boolean,
        "/XL",
        "Exclude lonely",
        "Exclude files and directories only present in the source",
    ),
    entry(
        Selection,
        Boolean,
        "/IS",
        "Include same",
        "Include files that are the same",
    ),
    entry(
        Selection,
        Boolean,
        "/IT",
        "Include tweaked",
        "Include tweaked files",
    ),
    entry(
        Selection,
        Text,
        "/MAX:n",
        "Maximum size",
        "Exclude files bigger than n bytes",
    )
    .hint("bytes"),
    entry(
        Selection,
        Text,
        "/MIN:n",
        "Minimum size",
        "Exclude files smaller than n bytes",
    )
    .hint("bytes"),
    entry(
        Selection,
        Text,
        "/MAXAGE:n",
        "Maximum age",
        "Exclude files older than n days or date (YYYYMMDD)",
    )
    .hint("days or YYYYMMDD"),
    entry(
        Selection,
        Text,
        "/MINAGE:n",
        "Minimum age",
        "Exclude files newer than n days or date (YYYYMMDD)",
    )
    .hint("days or YYYYMMDD"),
    entry(
        Selection,
        Boolean,
        "/XJ",
        "Exclude junctions",
        "Exclude junction points",
    ),
    entry(
        Selection,
        Boolean,
        "/FFT",
        "FAT file times",
        "Assume FAT file times (2-second granularity)",
    ),
    entry(
        Selection,
        Boolean,
        "/DST",
        "DST compensation",
        "Compensate for one-hour DST time differences",
    ),
    // Retry
    entry(
        Retry,
        Integer,
        "/R",
        "Retries",
        "Number of retries on failed copies (default is 1 million)",
    )
    .bounded(0, 1_000_000)
    .hint("3"),
    entry(
        Retry,
        Integer,
        "/W",
        "Wait time",
        "Wait time between retries in seconds (default is 30)",
    )
    .bounded(0, 3_600)
    .hint("5"),
    entry(
        Retry,
        Boolean,
        "/REG",
        "Save as default",
        "Save /R and /W in the registry as default settings",
    ),
    entry(
        Retry,
        Boolean,
        "/TBD",
        "Wait for share names",
        "Wait for share names to be defined (retry error 67)",
    ),
    // Logging
    entry(
        Logging,
        Boolean,
        SIMULATE_FLAG,
        "List only",
        "List files without copying, deleting or time-stamping them",
    ),
    entry(
        Logging,
        Boolean,
        "/X",
        "Report extra files",
        "Report all extra files, not just the selected ones",
    ),
    entry(
        Logging,
        Boolean,
        "/V",
        "Verbose",
        "Produce verbose output, showing skipped files",
    ),
    entry(
        Logging,
        Boolean,
        "/TS",
        "Timestamps",
        "Include source file timestamps in the output",
    ),
    entry(
        Logging,
        Boolean,
        "/FP",
        "Full paths",
        "Include full path names of files in the output",
    ),
    entry(
        Logging,
        Boolean,
        "/BYTES",
        "Sizes in bytes",
        "Print sizes as bytes",
    ),
    entry(Logging, Boolean, "/NS", "No size", "Don't log file sizes"),
    entry(
        Logging,
        Boolean,
        "/NC",
        "No class",
        "Don't log file classes",
    ),
    entry(
        Logging,
        Boolean,
        "/NFL",
        "No file list",
        "Don't log file names",
    ),
    entry(
        Logging,
        Boolean,
        "/NDL",
        "No directory list",
        "Don't log directory names",
    ),
    entry(
        Logging,
        Boolean,
        "/NP",
        "No progress",
        "Don't display percentage copied",
    ),
    entry(
        Logging,
        Boolean,
        "/ETA",
        "ETA",
        "Show estimated time of arrival of copied files",
    ),
    entry(
        Logging,
        Text,
        "/LOG",
        "Log file",
        "Write status output to the log file (overwrite)",
    )
    .hint("robocopy.log"),
    entry(
        Logging,
        Text,
        "/LOG+",
        "Log file (append)",
        "Write status output to the log file (append)",
    )
    .hint("robocopy.log"),
    entry(
        Logging,
        Text,
        "/UNILOG",
        "Unicode log file",
        "Write status output to the log file as Unicode (overwrite)",
    )
    .hint("robocopy.log"),
    entry(
        Logging,
        Boolean,
        "/TEE",
        "Tee",
        "Write output to the console as well as the log file",
    ),
    entry(
        Logging,
        Boolean,
        "/NJH",
        "No job header",
        "Don't print the job header",
    ),
    entry(
        Logging,
        Boolean,
        "/NJS",
        "No job summary",
        "Don't print the job summary",
    ),
    entry(
        Logging,
        Boolean,
        "/UNICODE",
        "Unicode output",
        "Output status as Unicode",
    ),
    // Jobs
    entry(
        Job,
        Text,
        "/JOB",
        "Load job",
        "Take parameters from the named job file",
    )
    .hint("jobname"),
    entry(
        Job,
        Text,
        "/SAVE",
        "Save job",
        "Save parameters to the named job file",
    )
    .hint("jobname"),
    entry(
        Job,
        Boolean,
        "/QUIT",
        "Quit after parsing",
        "Quit after processing the command line (to view parameters)",
    ),
    entry(
        Job,
        Boolean,
        "/NOSD",
        "No source directory",
        "No source directory is specified",
    ),
    entry(
        Job,
        Boolean,
        "/NODD",
        "No destination directory",
        "No destination directory is specified",
    ),
    // Other
    entry(
        Other,
        Integer,
        "/MT",
        "Multi-threaded",
        "Do multi-threaded copies with n threads (default 8)",
    )
    .bounded(1, 128)
    .hint("8"),
    entry(
        Other,
        Integer,
        "/MON",
        "Monitor changes",
        "Monitor source; run again when more than n changes are seen",
    )
    .bounded(1, 100_000)
    .hint("n"),
    entry(
        Other,
        Integer,
        "/MOT",
        "Monitor time",
        "Monitor source; run again in m minutes if changed",
    )
    .bounded(1, 1_440)
    .hint("m"),
    entry(
        Other,
        Text,
        "/RH:hhmm-hhmm",
        "Run hours",
        "Times when new copies may be started",
    )
    .hint("2200-0600"),
    entry(
        Other,
        Boolean,
        "/PF",
        "Check run hours per file",
        "Check run hours on a per-file (not per-pass) basis",
    ),
    entry(
        Other,
        Integer,
        "/IPG",
        "Inter-packet gap",
        "Inter-packet gap in milliseconds, to free bandwidth on slow lines",
    )
    .bounded(1, 10_000)
    .hint("ms"),
    entry(
        Other,
        Boolean,
        "/FAT",
        "8.3 names",
        "Create destination files using 8.3 FAT file names only",
    ),
    entry(
        Other,
        Boolean,
        "/256",
        "No long paths",
        "Turn off very long path (> 256 characters) support",
    ),
];

/// Look up an entry by its exact flag token.
pub fn find(flag: &str) -> Option<&'static OptionCatalogEntry> {
    CATALOG.iter().find(|e| e.flag == flag)
}

/// Look up an entry by the token a user typed: either the exact flag or its
/// base flag without the embedded placeholder. Case-insensitive.
pub fn find_by_token(token: &str) -> Option<&'static OptionCatalogEntry> {
    CATALOG
        .iter()
        .find(|e| e.flag.eq_ignore_ascii_case(token))
        .or_else(|| {
            CATALOG
                .iter()
                .find(|e| e.base_flag().eq_ignore_ascii_case(token))
        })
}

pub fn section_entries(section: Section) -> impl Iterator<Item = &'static OptionCatalogEntry> {
    CATALOG.iter().filter(move |e| e.section == section)
}

/// Value stored in a preset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetValue {
    On,
    Number(i64),
    Chars(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub values: &'static [(&'static str, PresetValue)],
}

impl Preset {
    pub fn options(&self) -> SelectedOptions {
        self.values
            .iter()
            .map(|(flag, v)| {
                let value = match v {
                    PresetValue::On => OptionValue::Boolean(true),
                    PresetValue::Number(n) => OptionValue::Integer(*n),
                    PresetValue::Chars(s) => OptionValue::CharSet((*s).to_string()),
                };
                ((*flag).to_string(), value)
            })
            .collect()
    }
}

pub static PRESETS: &[Preset] = &[
    Preset {
        name: "Mirror",
        description: "Exact copy of the source; deletes extra files at the destination",
        values: &[
            ("/MIR", PresetValue::On),
            ("/R", PresetValue::Number(3)),
            ("/W", PresetValue::Number(5)),
            ("/NP", PresetValue::On),
        ],
    },
    Preset {
        name: "Incremental",
        description: "Copy new and changed files only, never delete",
        values: &[
            ("/E", PresetValue::On),
            ("/XO", PresetValue::On),
            ("/R", PresetValue::Number(2)),
            ("/W", PresetValue::Number(5)),
        ],
    },
    Preset {
        name: "Network copy",
        description: "Restartable, multi-threaded copy with generous retries",
        values: &[
            ("/E", PresetValue::On),
            ("/Z", PresetValue::On),
            ("/MT", PresetValue::Number(8)),
            ("/R", PresetValue::Number(5)),
            ("/W", PresetValue::Number(10)),
        ],
    },
    Preset {
        name: "Full backup",
        description: "Copy everything with timestamps and attributes for files and directories",
        values: &[
            ("/E", PresetValue::On),
            ("/COPY", PresetValue::Chars("DAT")),
            ("/DCOPY", PresetValue::Chars("DAT")),
            ("/R", PresetValue::Number(3)),
            ("/W", PresetValue::Number(5)),
        ],
    },
    Preset {
        name: "Move",
        description: "Move files and directories to the destination",
        values: &[("/MOVE", PresetValue::On), ("/E", PresetValue::On)],
    },
];

pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub const DEFAULT_EXCLUDED_FILES: &[&str] = &[
    "Thumbs.db",
    "desktop.ini",
    "*.tmp",
    "~$*",
    ".DS_Store",
    "pagefile.sys",
    "hiberfil.sys",
];

pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "$RECYCLE.BIN",
    "System Volume Information",
    "node_modules",
    ".git",
];
