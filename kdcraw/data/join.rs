use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use glob::glob;
use toml::Value;

fn main() {
  println!("cargo:rerun-if-changed=data/cameras");

  let out_dir = env::var("OUT_DIR").expect("OUT_DIR must be set by cargo");
  let mut out = File::create(Path::new(&out_dir).join("cameras.toml")).expect("Failed to create cameras.toml");

  for entry in glob("./data/cameras/*/**/*.toml").expect("Failed to read glob pattern") {
    let path = entry.expect("Failed to read camera definition path");
    println!("cargo:rerun-if-changed={}", path.display());

    let mut toml = String::new();
    File::open(&path)
      .and_then(|mut f| f.read_to_string(&mut toml))
      .unwrap_or_else(|e| panic!("Failed to read {:?}: {:?}", path, e));

    if let Err(e) = toml.parse::<Value>() {
      panic!("Error parsing {:?}: {:?}", path, e);
    }

    out.write_all(b"[[cameras]]\n").unwrap();
    out.write_all(toml.as_bytes()).unwrap();
    out.write_all(b"\n").unwrap();
  }
}
