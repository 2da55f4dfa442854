mod mocks;
mod subscription;
mod webhook;
