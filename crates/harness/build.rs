//! Embeds every file under `fixtures/` as a text resource.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use walkdir::WalkDir;

fn main() {
	let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
	let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
	let fixtures = manifest_dir.join("fixtures");
	println!("cargo:rerun-if-changed={}", fixtures.display());

	let mut paths: Vec<PathBuf> = WalkDir::new(&fixtures)
		.into_iter()
		.filter_map(|e| e.ok())
		.filter(|e| e.file_type().is_file())
		.map(|e| e.into_path())
		.collect();
	paths.sort();

	let mut out = String::from("pub static EMBEDDED_RESOURCES: &[EmbeddedResource] = &[\n");
	for path in &paths {
		println!("cargo:rerun-if-changed={}", path.display());
		let relative = path.strip_prefix(&manifest_dir).expect("fixture outside manifest dir");
		let name = relative
			.components()
			.map(|c| c.as_os_str().to_string_lossy().into_owned())
			.collect::<Vec<_>>()
			.join("/");
		writeln!(
			out,
			"\tEmbeddedResource {{ name: {name:?}, text: include_str!({:?}) }},",
			path.display().to_string()
		)
		.unwrap();
	}
	out.push_str("];\n");

	fs::write(out_dir.join("embedded_resources.rs"), out).expect("failed to write embedded resources");
}
