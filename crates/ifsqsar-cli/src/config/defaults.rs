pub struct DefaultsConfig {
    pub models: String,
    pub header_rows: usize,
    pub target_header_row: usize,
    pub smiles_label: String,
    pub input_separator: String,
    pub input_line_ending: String,
    pub format: String,
    pub header: bool,
    pub separator: String,
    pub line_ending: String,
    pub keep_input: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            models: "default".to_string(),
            header_rows: 1,
            target_header_row: 1,
            smiles_label: "smiles".to_string(),
            input_separator: "\\t".to_string(),
            input_line_ending: "\\n".to_string(),
            format: "rows".to_string(),
            header: true,
            separator: "\t".to_string(),
            line_ending: "\n".to_string(),
            keep_input: true,
        }
    }
}
