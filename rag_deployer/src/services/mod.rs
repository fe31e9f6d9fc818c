pub mod huggingface_embedding;
