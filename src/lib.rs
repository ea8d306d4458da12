//! 法務ワークフロー実行エンジン
//!
//! 定義済みの法務ワークフロー（契約レビュー、訴訟リサーチ、デューデリジェンス等）を
//! ステップごとに AI と対話しながら進め、結果を文書として書き出します。
//!
//! # モジュール構成
//!
//! - [`config`][]: 設定とワークフロー定義（TOML）
//! - [`catalog`][]: 選択可能なワークフローの集合
//! - [`engine`][]: 実行エンジン（状態機械・コンテキスト集約・プロンプト調整・エクスポート）
//! - [`provider`][]: 補完サービス（Anthropic / OpenAI / Gemini）
//! - [`generator`][]: タスク記述からのワークフロー生成
//! - [`session`][]: 対話セッション（CLI 用）
//! - [`logging`][]: tracing の初期化
//! - [`error`][]: 設定・プロバイダーのエラー型

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod logging;
pub mod provider;
pub mod session;
