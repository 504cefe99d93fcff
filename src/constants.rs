pub const BYTES_PER_KB: usize = 1024;
pub const BYTES_PER_MB: usize = 1_048_576;

pub const DEFAULT_MAX_LINE_BYTES: usize = BYTES_PER_MB;
pub const MIN_MAX_LINE_BYTES: usize = BYTES_PER_KB;
pub const MAX_MAX_LINE_BYTES: usize = 64 * BYTES_PER_MB;

pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 4;
pub const MIN_CONCURRENT_FILES: usize = 1;
pub const MAX_CONCURRENT_FILES: usize = 256;

// Well under the common 1024 descriptor soft limit.
pub const DEFAULT_MAX_OPEN_BUCKETS: usize = 512;
pub const MIN_MAX_OPEN_BUCKETS: usize = 2;
pub const MAX_MAX_OPEN_BUCKETS: usize = BUCKET_ID_LIMIT as usize;

pub const DEFAULT_MERGE_PARALLELISM: usize = 8;
pub const MIN_MERGE_PARALLELISM: usize = 1;
pub const MAX_MERGE_PARALLELISM: usize = 64;

pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const MIN_IO_BUFFER_SIZE_KB: usize = 4;
pub const MAX_IO_BUFFER_SIZE_KB: usize = 16 * 1024;
pub const OUTPUT_BUFFER_SIZE_KB: usize = 512;
// Kept small, hundreds of bucket writers may be open at once.
pub const BUCKET_WRITE_BUFFER_SIZE_KB: usize = 8;

pub const DEFAULT_INPUT_DIRECTORY: &str = ".";
pub const SCRATCH_DIR_NAME: &str = "temp";
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "limpos.txt";
pub const DEFAULT_LINE_SUFFIX: &str = ".txt";
pub const BUCKET_FILE_EXTENSION: &str = ".txt";
pub const LINE_TERMINATOR: u8 = b'\n';

/// Size of the routing alphabet: `0-9` followed by `a-z`.
pub const ROUTING_RADIX: u16 = 36;
/// Exclusive upper bound of every bucket identifier.
pub const BUCKET_ID_LIMIT: u16 = ROUTING_RADIX * ROUTING_RADIX * ROUTING_RADIX;
/// Symbol shared by every character outside `[0-9a-z]`.
pub const ROUTING_OTHER_SYMBOL: u16 = ROUTING_RADIX - 1;
pub const SENTINEL_BUCKET_ID: u16 = 0;

pub const DEFAULT_REQUIRED_SUFFIX: &str = ".br";
pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

pub const DEFAULT_DENIED_DOMAINS: &[&str] = &[
    "gmail.com",
    "facebook.com",
    "hotmail.com",
    "outlook.com",
    "msn.com",
];

pub const DEFAULT_TRAP_WORDS: &[&str] = &[
    "abuse", "abuso", "autoresponse", "autoresposta", "auto-resposta", "bounce", "hacker",
    "honeypot", "nao_responder", "naoresponder", "noreply", "postmaster", "spam", "spammer",
];

pub const DEFAULT_RARE_NAMES: &[&str] = &[
    "aadiv", "aahva", "aaradhya", "adhira", "akanksh", "anaisha", "anant", "andrew", "anushka",
    "ashley", "asmee", "ayaan", "beverly", "billy", "bradley", "brandon", "brittany", "bryan",
    "cheryl", "dasya", "debra", "dorothy", "drishti", "edward", "heather", "idhant", "ishank",
    "ishita", "jeffrey", "joseph", "kabir", "kahaan", "kashvi", "kathryn", "keith", "kenneth",
    "kimaya", "krisha", "laksh", "larry", "lawrence", "mahika", "marilyn", "matthew", "mehar",
    "mishka", "nehrika", "nimit", "pahal", "parv", "pranay", "prisha", "raunak", "raymond",
    "reyansh", "rishaan", "rishit", "rohan", "rushil", "saanvi", "sadhil", "sahana", "scott",
    "shanaya", "shrishti", "sneha", "stephen", "svenn", "taahira", "taarush", "taksh", "tanvi",
    "timothy", "tyler", "vihaan", "vivaan", "willie", "zachary",
];

pub const VERBOSITY_SILENT: &str = "silent";
pub const VERBOSITY_NORMAL: &str = "normal";
pub const VERBOSITY_VERBOSE: &str = "verbose";
