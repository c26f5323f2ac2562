pub mod commands {
    pub const IMPORT: &str = "VC101";
    pub const MANAGE: &str = "VC110";
    pub const ACL: &str = "VC120";
    pub const SHOW: &str = "VC130";
    pub const REMOVE: &str = "VC140";
    pub const LIST: &str = "VC150";
    pub const GENERIC: &str = "VC000";
}
