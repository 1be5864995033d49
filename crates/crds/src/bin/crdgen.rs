//! Prints the CRD manifests for every resource in this crate as a single
//! multi-document YAML stream, ready for `kubectl apply -f -`.

use crds::{
    ContainerCheckpoint, ContainerCheckpointContent, PodCheckpoint, PodCheckpointContent,
    PodMigration,
};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let manifests = [
        serde_yaml::to_string(&PodMigration::crd())?,
        serde_yaml::to_string(&PodCheckpoint::crd())?,
        serde_yaml::to_string(&ContainerCheckpoint::crd())?,
        serde_yaml::to_string(&PodCheckpointContent::crd())?,
        serde_yaml::to_string(&ContainerCheckpointContent::crd())?,
    ];
    println!("{}", manifests.join("---\n"));
    Ok(())
}
