//! Deterministic names for child objects
//!
//! Every child is named as a pure function of its parent's name, so
//! concurrent reconciles collide on the object store's uniqueness check
//! instead of racing in memory.

/// Name of the PodCheckpoint a migration spawns.
pub fn pod_checkpoint_name(migration_name: &str) -> String {
    migration_name.to_string()
}

/// Name of the ContainerCheckpoint for one container of a PodCheckpoint.
pub fn container_checkpoint_name(pod_checkpoint_name: &str, container_name: &str) -> String {
    format!("{}-{}", pod_checkpoint_name, container_name)
}

/// Name of the content object bound to a ContainerCheckpoint.
pub fn container_content_name(container_checkpoint_name: &str) -> String {
    container_checkpoint_name.to_string()
}

/// Name of the content object bound to a PodCheckpoint.
pub fn pod_content_name(pod_checkpoint_name: &str) -> String {
    pod_checkpoint_name.to_string()
}

/// Name of the pod materialized from a checkpoint.
pub fn restored_pod_name(source_pod_name: &str) -> String {
    format!("{}-restored", source_pod_name)
}

/// Label key linking a ContainerCheckpoint to its parent PodCheckpoint.
pub const PARENT_LABEL: &str = "parent";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_parent_child_convention() {
        assert_eq!(pod_checkpoint_name("m1"), "m1");
        assert_eq!(container_checkpoint_name("m1", "c"), "m1-c");
        assert_eq!(container_content_name("m1-c"), "m1-c");
        assert_eq!(pod_content_name("m1"), "m1");
        assert_eq!(restored_pod_name("p1"), "p1-restored");
    }

    #[test]
    fn names_are_deterministic() {
        // Two computations of the same child name must collide.
        assert_eq!(
            container_checkpoint_name("m", "app"),
            container_checkpoint_name("m", "app")
        );
    }
}
