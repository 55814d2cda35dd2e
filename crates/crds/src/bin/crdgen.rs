//! Prints the CustomResourceDefinitions as a multi-document YAML stream.
//!
//! Usage: `cargo run -p crds --bin crdgen > deploy/crds/crds.yaml`

use crds::{Install, KnativeEventing};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let crds = [KnativeEventing::crd(), Install::crd()];
    for (i, crd) in crds.iter().enumerate() {
        if i > 0 {
            println!("---");
        }
        print!("{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
