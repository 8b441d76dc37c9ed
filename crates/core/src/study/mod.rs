//! Study artifact generators layered over a chat-completion model:
//! summaries, flashcards, question banks, and mind maps.

pub mod flashcards;
pub mod llm;
pub mod mindmap;
pub mod qna;
pub mod summary;
