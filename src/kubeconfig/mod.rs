// src/kubeconfig/mod.rs
mod kube;

pub use kube::{
    ClusterInfo, ContextInfo, Endpoint, KubeConfig, NamedCluster, NamedContext, NamedUser, UserInfo,
    ADMIN_KUBECONFIG, AGGREGATOR_KUBECONFIG, BOOTSTRAP_KUBECONFIG, MASTER_KUBECONFIG,
};
