use std::fs;

const CONFIG_PATH: &str = "src/default_config.toml";

const REQUIRED_KEYS: &[(&str, &[&str])] = &[
    (
        "layout",
        &["max_image_width", "default_image_width", "default_image_height"],
    ),
    (
        "renderer",
        &[
            "viewport_width",
            "viewport_height",
            "padding",
            "timeout_ms",
            "mermaid_script",
            "plantuml_server",
            "plantuml_format",
        ],
    ),
];

fn main() {
    // The bundled defaults are parsed at runtime without a fallback path
    println!("cargo:rerun-if-changed={CONFIG_PATH}");

    let content = fs::read_to_string(CONFIG_PATH).expect("Failed to read default_config.toml");
    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid default_config.toml: {e}"),
    };

    for (section, keys) in REQUIRED_KEYS {
        let Some(values) = table.get(*section).and_then(toml::Value::as_table) else {
            panic!("default_config.toml is missing the [{section}] section");
        };
        for key in *keys {
            if !values.contains_key(*key) {
                panic!("default_config.toml is missing {section}.{key}");
            }
        }
    }
}
