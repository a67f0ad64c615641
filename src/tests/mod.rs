mod console;
mod stack;
