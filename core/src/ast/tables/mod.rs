// Per-language mapping tables - 原生节点类型到统一节点形状的映射

pub mod java;
pub mod javascript;
pub mod python;
